use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

/// Owns the bus; hand out one [`SharedI2cInstance`] per device.
pub struct SharedI2c<I2C> {
    driver: Arc<Mutex<I2C>>,
}

impl<I2C> SharedI2c<I2C> {
    pub fn new(driver: I2C) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
        }
    }

    pub fn clone_driver(&self) -> SharedI2cInstance<I2C> {
        SharedI2cInstance {
            driver: self.driver.clone(),
        }
    }
}

pub struct SharedI2cInstance<I2C> {
    driver: Arc<Mutex<I2C>>,
}

impl<I2C> SharedI2cInstance<I2C> {
    fn lock(&self) -> MutexGuard<'_, I2C> {
        self.driver.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<I2C: ErrorType> ErrorType for SharedI2cInstance<I2C> {
    type Error = I2C::Error;
}

impl<I2C: I2c<SevenBitAddress>> I2c<SevenBitAddress> for SharedI2cInstance<I2C> {
    fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.lock().read(address, read)
    }

    fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.lock().write(address, write)
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Self::Error> {
        self.lock().write_read(address, write, read)
    }

    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.lock().transaction(address, operations)
    }
}
