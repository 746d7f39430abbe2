//! Auticare wearable: heart rate, GSR and temperature sampling with
//! OLED status and HTTP reporting.
//!
//! Everything hardware independent builds on the host; the ESP-IDF glue
//! (`wifi`, NVS settings, HTTP client, bus setup) only for `target_os = "espidf"`.

use thiserror::Error;

pub mod config;
pub mod display;
pub mod helpers;
pub mod max3010x;
pub mod postman;
pub mod pulse;
#[cfg(target_os = "espidf")]
pub mod wifi;

/// Conditions the firmware refuses to run under.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    #[error("MAX3010x was not found. Please check wiring/power.")]
    SensorNotFound,
    #[error("SSD1306 allocation failed")]
    DisplayNotFound,
}
