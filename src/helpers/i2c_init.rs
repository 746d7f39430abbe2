use std::time::Duration;

use esp_idf_svc::hal::{
    gpio::{Gpio6, Gpio7},
    i2c::{I2cConfig, I2cDriver, I2C0},
    units::KiloHertz,
};
use log::info;

use crate::config::{I2C_BAUDRATE_KHZ, I2C_TIMEOUT_MS};
use crate::helpers::shared_i2c::SharedI2c;

pub struct Pins {
    pub sda: Gpio6,
    pub scl: Gpio7,
    pub i2c: I2C0,
}

pub type HardwareI2c = SharedI2c<I2cDriver<'static>>;

/// Brings up the single bus shared by the pulse sensor and the OLED.
pub fn initialize_bus(pins: Pins) -> anyhow::Result<HardwareI2c> {
    let driver = I2cDriver::new(pins.i2c, pins.sda, pins.scl, &create_i2c_config())?;
    info!("I2C bus up at {I2C_BAUDRATE_KHZ} kHz");
    Ok(SharedI2c::new(driver))
}

fn create_i2c_config() -> I2cConfig {
    I2cConfig::new()
        .baudrate(KiloHertz::from(I2C_BAUDRATE_KHZ).into())
        .timeout(Duration::from_millis(I2C_TIMEOUT_MS).into())
}
