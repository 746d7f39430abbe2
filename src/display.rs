//! 128x32 SSD1306 status screen.
//!
//! Layout:
//! ```text
//! :) Auticare ...        ((o)) *
//! Temp:31.9 HR:72.3
//! GSR:16
//! ```

use display_interface::DisplayError;
use embedded_graphics::{
    image::{Image, ImageRaw},
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Circle, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use embedded_hal::i2c::I2c;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use crate::config::{I2C_ADDR_OLED, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::helpers::readings::SensorData;

/// The 128x32 panel in buffered graphics mode; draw, then `flush()`.
pub type Oled<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>;

/// Brings the panel up. An error here means nothing answered on the OLED address.
pub fn init_oled<I2C: I2c>(i2c: I2C) -> Result<Oled<I2C>, DisplayError> {
    let interface = I2CDisplayInterface::new_custom_address(i2c, I2C_ADDR_OLED);
    let mut oled = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    oled.init()?;
    oled.flush()?;
    Ok(oled)
}

// ---------------------------------------------------------------------------
// Screen layout
// ---------------------------------------------------------------------------

const SMILEY: [u8; 8] = [
    0b00111100, 0b01000010, 0b10100101, 0b10000001, 0b10100101, 0b10011001, 0b01000010,
    0b00111100,
];

const TITLE: &str = "Auticare";
const TITLE_X: i32 = 10;
const PROGRESS_X: i32 = TITLE_X + 6 * TITLE.len() as i32 + 4;
const WIFI_ICON_X: i32 = SCREEN_WIDTH as i32 - 20;
const STATUS_DOT_X: i32 = SCREEN_WIDTH as i32 - 10;
const ICON_Y: i32 = 5;
const DATA_TOP: i32 = 10;

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

/// Header row: smiley, title, WiFi icon and a dot that is filled while connected.
pub fn draw_layout<D>(target: &mut D, wifi_connected: bool) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    let smiley = ImageRaw::<BinaryColor>::new(&SMILEY, 8);
    Image::new(&smiley, Point::zero()).draw(target)?;
    Text::with_baseline(TITLE, Point::new(TITLE_X, 0), text_style(), Baseline::Top)
        .draw(target)?;

    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
    Circle::with_center(Point::new(WIFI_ICON_X, ICON_Y), 5)
        .into_styled(stroke)
        .draw(target)?;
    Circle::with_center(Point::new(WIFI_ICON_X, ICON_Y), 11)
        .into_styled(stroke)
        .draw(target)?;

    let dot = Circle::with_center(Point::new(STATUS_DOT_X, ICON_Y), 5);
    if wifi_connected {
        dot.into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(target)?;
    } else {
        dot.into_styled(stroke).draw(target)?;
    }
    Ok(())
}

/// Cycles one to four dots after the title while WiFi associates.
pub fn draw_connecting<D>(target: &mut D, attempt: u32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let dots = ".".repeat((attempt % 4) as usize + 1);
    Rectangle::new(Point::new(PROGRESS_X, 0), Size::new(6 * 4, 10))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
        .draw(target)?;
    Text::with_baseline(&dots, Point::new(PROGRESS_X, 0), text_style(), Baseline::Top)
        .draw(target)?;
    Ok(())
}

/// Replaces the two data rows below the header.
pub fn draw_readings<D>(target: &mut D, data: &SensorData) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Rectangle::new(
        Point::new(0, DATA_TOP),
        Size::new(SCREEN_WIDTH, SCREEN_HEIGHT - DATA_TOP as u32),
    )
    .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
    .draw(target)?;

    let vitals = format!("Temp:{:.1} HR:{:.1}", data.temperature, data.bpm);
    Text::with_baseline(&vitals, Point::new(0, DATA_TOP), text_style(), Baseline::Top)
        .draw(target)?;
    let gsr = format!("GSR:{}", data.gsr);
    Text::with_baseline(&gsr, Point::new(0, DATA_TOP + 10), text_style(), Baseline::Top)
        .draw(target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::fake_bus::FakeBus;
    use crate::pulse::Reading;
    use core::convert::Infallible;

    const W: usize = SCREEN_WIDTH as usize;
    const H: usize = SCREEN_HEIGHT as usize;

    /// Plain framebuffer so the layout can be inspected pixel by pixel.
    struct Screen {
        pixels: [[bool; W]; H],
    }

    impl Screen {
        fn new() -> Self {
            Self {
                pixels: [[false; W]; H],
            }
        }

        fn pixel(&self, x: u32, y: u32) -> bool {
            self.pixels[y as usize][x as usize]
        }

        fn any_lit(&self, xs: core::ops::Range<u32>, ys: core::ops::Range<u32>) -> bool {
            xs.flat_map(|x| ys.clone().map(move |y| (x, y)))
                .any(|(x, y)| self.pixel(x, y))
        }
    }

    impl OriginDimensions for Screen {
        fn size(&self) -> Size {
            Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)
        }
    }

    impl DrawTarget for Screen {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if (0..W as i32).contains(&point.x) && (0..H as i32).contains(&point.y) {
                    self.pixels[point.y as usize][point.x as usize] = color.is_on();
                }
            }
            Ok(())
        }
    }

    #[test]
    fn init_talks_to_oled_address() {
        let bus = FakeBus::new();
        assert!(init_oled(bus.clone()).is_ok());

        let writes = bus.writes();
        assert!(!writes.is_empty());
        assert!(writes.iter().all(|(address, _)| *address == I2C_ADDR_OLED));
        // command frames first, then the cleared frame buffer as data frames
        assert_eq!(writes[0].1[0], 0x00);
        assert!(writes.iter().any(|(_, bytes)| bytes[0] == 0x40));
    }

    #[test]
    fn init_fails_without_display() {
        let bus = FakeBus::new();
        bus.set_nack(true);
        assert!(init_oled(bus).is_err());
    }

    #[test]
    fn layout_draws_smiley_and_status_dot() {
        let mut screen = Screen::new();
        draw_layout(&mut screen, true).unwrap();
        // smiley top row is 0b00111100
        assert!(!screen.pixel(0, 0));
        assert!(screen.pixel(2, 0));
        assert!(screen.pixel(STATUS_DOT_X as u32, ICON_Y as u32));
        assert!(screen.any_lit(TITLE_X as u32..60, 0..10));

        draw_layout(&mut screen, false).unwrap();
        assert!(!screen.pixel(STATUS_DOT_X as u32, ICON_Y as u32));
        assert!(screen.any_lit(STATUS_DOT_X as u32 - 2..STATUS_DOT_X as u32 + 3, 3..8));
    }

    #[test]
    fn readings_fill_only_data_rows() {
        let mut screen = Screen::new();
        draw_layout(&mut screen, true).unwrap();
        let reading = Reading {
            bpm: 72.3,
            avg_bpm: 70,
            finger_present: false,
        };
        draw_readings(&mut screen, &SensorData::new(reading, 685, 16, 31.9)).unwrap();
        assert!(screen.pixel(2, 0));
        assert!(screen.any_lit(0..100, 10..20));
        assert!(screen.any_lit(0..40, 20..30));
    }

    #[test]
    fn progress_dots_cycle() {
        let mut screen = Screen::new();
        draw_connecting(&mut screen, 3).unwrap();
        let x_end = (PROGRESS_X + 24) as u32;
        assert!(screen.any_lit(PROGRESS_X as u32 + 18..x_end, 0..10));
        draw_connecting(&mut screen, 4).unwrap();
        assert!(!screen.any_lit(PROGRESS_X as u32 + 6..x_end, 0..10));
        assert!(screen.any_lit(PROGRESS_X as u32..PROGRESS_X as u32 + 6, 0..10));
    }
}
