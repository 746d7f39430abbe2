pub mod gsr;
#[cfg(target_os = "espidf")]
pub mod i2c_init;
pub mod interval;
pub mod readings;
pub mod shared_i2c;

#[cfg(test)]
pub(crate) mod fake_bus;
