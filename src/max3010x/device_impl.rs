use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c, SevenBitAddress};

use crate::max3010x::{
    AdcRange, Error, LedMode, Max3010x, PulseWidth, SampleAverage, SampleRate, DEVICE_ADDRESS,
    EXPECTED_PART_ID,
};
use crate::pulse::InfraredSource;

pub(crate) struct Register;
impl Register {
    pub const INT_STAT2: u8 = 0x01;
    pub const INT_ENABLE2: u8 = 0x03;
    pub const FIFO_WRITE_PTR: u8 = 0x04;
    pub const FIFO_OVERFLOW: u8 = 0x05;
    pub const FIFO_READ_PTR: u8 = 0x06;
    pub const FIFO_DATA: u8 = 0x07;
    pub const FIFO_CONFIG: u8 = 0x08;
    pub const MODE_CONFIG: u8 = 0x09;
    pub const PARTICLE_CONFIG: u8 = 0x0A;
    pub const LED1_PULSE_AMP: u8 = 0x0C;
    pub const LED2_PULSE_AMP: u8 = 0x0D;
    pub const LED3_PULSE_AMP: u8 = 0x0E;
    pub const LED_PROX_AMP: u8 = 0x10;
    pub const MULTI_LED_CONFIG1: u8 = 0x11;
    pub const MULTI_LED_CONFIG2: u8 = 0x12;
    pub const DIE_TEMP_INT: u8 = 0x1F;
    pub const DIE_TEMP_FRAC: u8 = 0x20;
    pub const DIE_TEMP_CONFIG: u8 = 0x21;
    pub const PART_ID: u8 = 0xFF;
}

const RESET: u8 = 0x40;
const DIE_TEMP_READY: u8 = 0x02;
const ROLLOVER_ENABLE: u8 = 0x10;

const SLOT_RED: u8 = 0x01;
const SLOT_IR: u8 = 0x02;
const SLOT_GREEN: u8 = 0x03;

const FIFO_DEPTH: u8 = 32;
const BYTES_PER_CHANNEL: usize = 3;
const SAMPLE_MASK: u32 = 0x3FFFF;
const MAX_FIFO_BYTES: usize = FIFO_DEPTH as usize * 3 * BYTES_PER_CHANNEL;

const RESET_TIMEOUT_MS: u32 = 100;
const DATA_TIMEOUT_MS: u32 = 250;
const TEMP_TIMEOUT_MS: u32 = 100;

/// Power-on configuration, defaults match the vendor's reference setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    pub led_amplitude: u8,
    pub sample_average: SampleAverage,
    pub led_mode: LedMode,
    pub sample_rate: SampleRate,
    pub pulse_width: PulseWidth,
    pub adc_range: AdcRange,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            led_amplitude: 0x1F,
            sample_average: SampleAverage::_4,
            led_mode: LedMode::RedIrGreen,
            sample_rate: SampleRate::_400,
            pulse_width: PulseWidth::_411us,
            adc_range: AdcRange::_4096nA,
        }
    }
}

/// One FIFO entry, channels the current mode does not sample stay zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    pub red: u32,
    pub ir: u32,
    pub green: u32,
}

impl<I2C> Max3010x<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    pub fn new(i2c: I2C) -> Self {
        Max3010x { i2c, active_leds: 0 }
    }

    /// Checks that a MAX3010x answers on the bus.
    pub fn probe(&mut self) -> Result<(), Error<I2C::Error>> {
        let part_id = self.read_register(Register::PART_ID)?;
        if part_id != EXPECTED_PART_ID {
            return Err(Error::NotFound(part_id));
        }
        Ok(())
    }

    pub fn soft_reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<I2C::Error>> {
        self.update_register(Register::MODE_CONFIG, !RESET, RESET)?;
        for _ in 0..RESET_TIMEOUT_MS {
            if self.read_register(Register::MODE_CONFIG)? & RESET == 0 {
                return Ok(());
            }
            delay.delay_ms(1);
        }
        Err(Error::Timeout)
    }

    pub fn setup<D: DelayNs>(
        &mut self,
        config: &SensorConfig,
        delay: &mut D,
    ) -> Result<(), Error<I2C::Error>> {
        self.soft_reset(delay)?;

        self.update_register(Register::FIFO_CONFIG, 0x1F, config.sample_average.bits())?;
        self.update_register(Register::FIFO_CONFIG, !ROLLOVER_ENABLE, ROLLOVER_ENABLE)?;
        self.update_register(Register::MODE_CONFIG, 0xF8, config.led_mode.bits())?;
        self.active_leds = config.led_mode.active_leds();

        self.update_register(Register::PARTICLE_CONFIG, 0x9F, config.adc_range.bits())?;
        self.update_register(Register::PARTICLE_CONFIG, 0xE3, config.sample_rate.bits())?;
        self.update_register(Register::PARTICLE_CONFIG, 0xFC, config.pulse_width.bits())?;

        self.set_pulse_amplitude_red(config.led_amplitude)?;
        self.set_pulse_amplitude_ir(config.led_amplitude)?;
        self.set_pulse_amplitude_green(config.led_amplitude)?;
        self.write_register(Register::LED_PROX_AMP, config.led_amplitude)?;

        self.update_register(Register::MULTI_LED_CONFIG1, 0xF8, SLOT_RED)?;
        if self.active_leds > 1 {
            self.update_register(Register::MULTI_LED_CONFIG1, 0x8F, SLOT_IR << 4)?;
        }
        if self.active_leds > 2 {
            self.update_register(Register::MULTI_LED_CONFIG2, 0xF8, SLOT_GREEN)?;
        }

        self.clear_fifo()
    }

    pub fn set_pulse_amplitude_red(&mut self, amplitude: u8) -> Result<(), Error<I2C::Error>> {
        self.write_register(Register::LED1_PULSE_AMP, amplitude)
    }

    pub fn set_pulse_amplitude_ir(&mut self, amplitude: u8) -> Result<(), Error<I2C::Error>> {
        self.write_register(Register::LED2_PULSE_AMP, amplitude)
    }

    pub fn set_pulse_amplitude_green(&mut self, amplitude: u8) -> Result<(), Error<I2C::Error>> {
        self.write_register(Register::LED3_PULSE_AMP, amplitude)
    }

    /// Raises INT_STAT2 once a die temperature conversion finishes.
    pub fn enable_die_temp_ready(&mut self) -> Result<(), Error<I2C::Error>> {
        self.update_register(Register::INT_ENABLE2, !DIE_TEMP_READY, DIE_TEMP_READY)
    }

    pub fn clear_fifo(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_register(Register::FIFO_WRITE_PTR, 0)?;
        self.write_register(Register::FIFO_OVERFLOW, 0)?;
        self.write_register(Register::FIFO_READ_PTR, 0)
    }

    /// Drains the FIFO and returns the newest sample, `None` when it was empty.
    pub fn poll(&mut self) -> Result<Option<Sample>, Error<I2C::Error>> {
        let read_ptr = self.read_register(Register::FIFO_READ_PTR)?;
        let write_ptr = self.read_register(Register::FIFO_WRITE_PTR)?;
        if read_ptr == write_ptr || self.active_leds == 0 {
            return Ok(None);
        }

        let pending = usize::from(write_ptr.wrapping_sub(read_ptr) % FIFO_DEPTH);
        let frame = usize::from(self.active_leds) * BYTES_PER_CHANNEL;
        let mut buffer = [0u8; MAX_FIFO_BYTES];
        let bytes = &mut buffer[..pending * frame];
        self.i2c
            .write_read(DEVICE_ADDRESS, &[Register::FIFO_DATA], bytes)
            .map_err(Error::I2C)?;

        Ok(bytes
            .chunks_exact(frame)
            .last()
            .map(|raw| parse_sample(raw, self.active_leds)))
    }

    /// Waits up to 250 ms for fresh data and returns its IR channel.
    pub fn read_ir<D: DelayNs>(&mut self, delay: &mut D) -> Result<u32, Error<I2C::Error>> {
        for _ in 0..DATA_TIMEOUT_MS {
            if let Some(sample) = self.poll()? {
                return Ok(sample.ir);
            }
            delay.delay_ms(1);
        }
        Err(Error::Timeout)
    }

    /// Die temperature in °C.
    pub fn read_temperature<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<f32, Error<I2C::Error>> {
        self.write_register(Register::DIE_TEMP_CONFIG, 0x01)?;
        let mut ready = false;
        for _ in 0..TEMP_TIMEOUT_MS {
            if self.read_register(Register::INT_STAT2)? & DIE_TEMP_READY != 0 {
                ready = true;
                break;
            }
            delay.delay_ms(1);
        }
        if !ready {
            return Err(Error::Timeout);
        }
        let integer = self.read_register(Register::DIE_TEMP_INT)? as i8;
        let fraction = self.read_register(Register::DIE_TEMP_FRAC)?;
        Ok(die_temperature(integer, fraction))
    }

    fn update_register(&mut self, register: u8, keep: u8, set: u8) -> Result<(), Error<I2C::Error>> {
        let current = self.read_register(register)?;
        self.write_register(register, (current & keep) | set)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(DEVICE_ADDRESS, &[register, value])
            .map_err(Error::I2C)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Error<I2C::Error>> {
        let mut data = [0; 1];
        self.i2c
            .write_read(DEVICE_ADDRESS, &[register], &mut data)
            .map_err(Error::I2C)
            .and(Ok(data[0]))
    }
}

/// Sensor paired with the delay it polls with, so it can serve as an [`InfraredSource`].
pub struct IrReader<'a, I2C, D> {
    pub sensor: &'a mut Max3010x<I2C>,
    pub delay: &'a mut D,
}

impl<I2C, D> InfraredSource for IrReader<'_, I2C, D>
where
    I2C: I2c<SevenBitAddress>,
    D: DelayNs,
{
    type Error = Error<<I2C as ErrorType>::Error>;

    fn sample_infrared(&mut self) -> Result<u32, Self::Error> {
        self.sensor.read_ir(&mut *self.delay)
    }
}

fn parse_sample(raw: &[u8], active_leds: u8) -> Sample {
    let channel = |index: usize| -> u32 {
        let b = &raw[index * BYTES_PER_CHANNEL..(index + 1) * BYTES_PER_CHANNEL];
        (u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2])) & SAMPLE_MASK
    };
    Sample {
        red: channel(0),
        ir: if active_leds > 1 { channel(1) } else { 0 },
        green: if active_leds > 2 { channel(2) } else { 0 },
    }
}

fn die_temperature(integer: i8, fraction: u8) -> f32 {
    f32::from(integer) + f32::from(fraction) * 0.0625
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::fake_bus::{FakeBus, NoDelay};

    fn sensor_with_mode(bus: FakeBus, mode: LedMode) -> Max3010x<FakeBus> {
        let mut sensor = Max3010x::new(bus);
        let config = SensorConfig {
            led_mode: mode,
            ..SensorConfig::default()
        };
        sensor.setup(&config, &mut NoDelay).unwrap();
        sensor
    }

    fn channel_bytes(value: u32) -> [u8; 3] {
        [(value >> 16) as u8, (value >> 8) as u8, value as u8]
    }

    #[test]
    fn probe_accepts_max30105() {
        let bus = FakeBus::new();
        bus.set_register(Register::PART_ID, 0x15);
        assert!(Max3010x::new(bus).probe().is_ok());
    }

    #[test]
    fn probe_rejects_other_parts() {
        let bus = FakeBus::new();
        bus.set_register(Register::PART_ID, 0x11);
        assert!(matches!(
            Max3010x::new(bus).probe(),
            Err(Error::NotFound(0x11))
        ));
    }

    #[test]
    fn setup_writes_reference_configuration() {
        let bus = FakeBus::new();
        let _sensor = sensor_with_mode(bus.clone(), LedMode::RedIrGreen);
        assert_eq!(bus.register(Register::FIFO_CONFIG), 0x40 | 0x10);
        assert_eq!(bus.register(Register::MODE_CONFIG), 0x07);
        assert_eq!(bus.register(Register::PARTICLE_CONFIG), 0x20 | 0x0C | 0x03);
        assert_eq!(bus.register(Register::LED1_PULSE_AMP), 0x1F);
        assert_eq!(bus.register(Register::LED_PROX_AMP), 0x1F);
        assert_eq!(bus.register(Register::MULTI_LED_CONFIG1), 0x21);
        assert_eq!(bus.register(Register::MULTI_LED_CONFIG2), 0x03);
        assert_eq!(bus.register(Register::FIFO_READ_PTR), 0);
    }

    #[test]
    fn read_ir_returns_newest_masked_sample() {
        let bus = FakeBus::new();
        let mut sensor = sensor_with_mode(bus.clone(), LedMode::RedIrGreen);

        let mut fifo = Vec::new();
        for (red, ir, green) in [(1000, 60_000, 5), (1001, 0xFFFFFF, 6)] {
            fifo.extend_from_slice(&channel_bytes(red));
            fifo.extend_from_slice(&channel_bytes(ir));
            fifo.extend_from_slice(&channel_bytes(green));
        }
        bus.push_fifo(&fifo);
        bus.set_register(Register::FIFO_WRITE_PTR, 2);

        assert_eq!(sensor.read_ir(&mut NoDelay).unwrap(), 0x3FFFF);
    }

    #[test]
    fn read_ir_times_out_without_data() {
        let bus = FakeBus::new();
        let mut sensor = sensor_with_mode(bus, LedMode::RedIr);
        assert!(matches!(sensor.read_ir(&mut NoDelay), Err(Error::Timeout)));
    }

    #[test]
    fn pointer_wrap_counts_pending_samples() {
        let bus = FakeBus::new();
        let mut sensor = sensor_with_mode(bus.clone(), LedMode::RedIr);
        let mut fifo = Vec::new();
        for ir in [10, 20, 30] {
            fifo.extend_from_slice(&channel_bytes(1));
            fifo.extend_from_slice(&channel_bytes(ir));
        }
        bus.push_fifo(&fifo);
        bus.set_register(Register::FIFO_READ_PTR, 31);
        bus.set_register(Register::FIFO_WRITE_PTR, 2);

        let sample = sensor.poll().unwrap().unwrap();
        assert_eq!(sample, Sample { red: 1, ir: 30, green: 0 });
    }

    #[test]
    fn infrared_source_reads_through_sensor() {
        let bus = FakeBus::new();
        let mut sensor = sensor_with_mode(bus.clone(), LedMode::RedIr);
        let mut fifo = channel_bytes(7).to_vec();
        fifo.extend_from_slice(&channel_bytes(42_000));
        bus.push_fifo(&fifo);
        bus.set_register(Register::FIFO_WRITE_PTR, 1);

        let mut delay = NoDelay;
        let mut source = IrReader {
            sensor: &mut sensor,
            delay: &mut delay,
        };
        assert_eq!(source.sample_infrared().unwrap(), 42_000);
    }

    #[test]
    fn temperature_combines_integer_and_fraction() {
        let bus = FakeBus::new();
        let mut sensor = sensor_with_mode(bus.clone(), LedMode::RedIr);
        sensor.enable_die_temp_ready().unwrap();
        assert_eq!(bus.register(Register::INT_ENABLE2), DIE_TEMP_READY);

        bus.set_register(Register::DIE_TEMP_INT, 31);
        bus.set_register(Register::DIE_TEMP_FRAC, 15);
        let t = sensor.read_temperature(&mut NoDelay).unwrap();
        assert!((t - 31.9375).abs() < 1e-6);
    }

    #[test]
    fn negative_die_temperature() {
        assert_eq!(die_temperature(-3, 8), -2.5);
    }
}
