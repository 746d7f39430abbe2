mod device_impl;

pub use device_impl::{IrReader, Sample, SensorConfig};

/// All possible errors of the MAX3010x driver
#[derive(Debug)]
pub enum Error<E> {
    /// I²C bus error
    I2C(E),
    /// Something answered, but the part id is not a MAX3010x
    NotFound(u8),
    /// The sensor did not produce data in time
    Timeout,
}
impl<E> From<E> for Error<E> {
    fn from(other: E) -> Self {
        Error::I2C(other)
    }
}

const DEVICE_ADDRESS: u8 = crate::config::I2C_ADDR_MAX3010X;
const EXPECTED_PART_ID: u8 = 0x15;

/// MAX30105 / MAX30102 optical sensor driver.
#[derive(Debug)]
pub struct Max3010x<I2C> {
    /// The concrete I²C device implementation.
    i2c: I2C,
    active_leds: u8,
}

/// Number of samples averaged on chip per FIFO entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleAverage {
    _1,
    _2,
    _4,
    _8,
    _16,
    _32,
}

impl SampleAverage {
    fn bits(self) -> u8 {
        match self {
            SampleAverage::_1 => 0x00,
            SampleAverage::_2 => 0x20,
            SampleAverage::_4 => 0x40,
            SampleAverage::_8 => 0x60,
            SampleAverage::_16 => 0x80,
            SampleAverage::_32 => 0xA0,
        }
    }
}

/// Which LEDs are sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedMode {
    /// Red only
    Red,
    /// Red + IR
    RedIr,
    /// Red + IR + Green
    RedIrGreen,
}

impl LedMode {
    pub fn active_leds(self) -> u8 {
        match self {
            LedMode::Red => 1,
            LedMode::RedIr => 2,
            LedMode::RedIrGreen => 3,
        }
    }

    fn bits(self) -> u8 {
        match self {
            LedMode::Red => 0x02,
            LedMode::RedIr => 0x03,
            LedMode::RedIrGreen => 0x07,
        }
    }
}

/// Samples per second
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleRate {
    _50,
    _100,
    _200,
    _400,
    _800,
    _1000,
    _1600,
    _3200,
}

impl SampleRate {
    fn bits(self) -> u8 {
        match self {
            SampleRate::_50 => 0x00,
            SampleRate::_100 => 0x04,
            SampleRate::_200 => 0x08,
            SampleRate::_400 => 0x0C,
            SampleRate::_800 => 0x10,
            SampleRate::_1000 => 0x14,
            SampleRate::_1600 => 0x18,
            SampleRate::_3200 => 0x1C,
        }
    }
}

/// LED pulse width, also sets the ADC resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulseWidth {
    /// 69 µs, 15 bit
    _69us,
    /// 118 µs, 16 bit
    _118us,
    /// 215 µs, 17 bit
    _215us,
    /// 411 µs, 18 bit
    _411us,
}

impl PulseWidth {
    fn bits(self) -> u8 {
        match self {
            PulseWidth::_69us => 0x00,
            PulseWidth::_118us => 0x01,
            PulseWidth::_215us => 0x02,
            PulseWidth::_411us => 0x03,
        }
    }
}

/// ADC full scale range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdcRange {
    _2048nA,
    _4096nA,
    _8192nA,
    _16384nA,
}

impl AdcRange {
    fn bits(self) -> u8 {
        match self {
            AdcRange::_2048nA => 0x00,
            AdcRange::_4096nA => 0x20,
            AdcRange::_8192nA => 0x40,
            AdcRange::_16384nA => 0x60,
        }
    }
}
