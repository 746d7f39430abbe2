use core::fmt::{Debug, Write};

use log::{info, warn};

use crate::pulse::Reading;

pub const CSV_HEADER: &str = "Timestamp,GSR,Temperature,IR,BPM,Avg_BPM,No_Finger";

/// One full set of measurements, as logged, displayed and posted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorData {
    pub gsr: u16,
    /// Sensor die temperature in °C
    pub temperature: f32,
    pub ir: u32,
    pub bpm: f32,
    pub avg_bpm: u8,
    /// Raw IR below the finger threshold, same value as [`Reading::finger_present`].
    pub no_finger: bool,
    pub latitude: f64,
    pub longitude: f64,
}

impl SensorData {
    pub fn new(reading: Reading, ir: u32, gsr: u16, temperature: f32) -> Self {
        Self {
            gsr,
            temperature,
            ir,
            bpm: reading.bpm,
            avg_bpm: reading.avg_bpm,
            no_finger: reading.finger_present,
            // no GPS fitted
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    pub fn csv_row(&self, timestamp_ms: u32) -> String {
        let mut row = String::with_capacity(48);
        // writing into a String cannot fail
        let _ = write!(
            row,
            "{},{},{:.2},{},{:.2},{},{}",
            timestamp_ms,
            self.gsr,
            self.temperature,
            self.ir,
            self.bpm,
            self.avg_bpm,
            if self.no_finger { "1" } else { "0" }
        );
        row
    }

    pub fn log_summary(&self) {
        info!(
            "--- Sensor Readings --- GSR: {}, Temperature: {:.2}, IR: {}, BPM: {:.2}, Avg BPM: {}",
            self.gsr, self.temperature, self.ir, self.bpm, self.avg_bpm
        );
        if self.no_finger {
            warn!("No finger?");
        }
    }
}

/// Slow sensor value that survives failed reads by repeating the last good one.
#[derive(Debug, Clone, Copy)]
pub struct LastGood<T> {
    name: &'static str,
    value: T,
}

impl<T: Copy + Debug> LastGood<T> {
    pub const fn new(name: &'static str, initial: T) -> Self {
        Self {
            name,
            value: initial,
        }
    }

    pub fn update<E: Debug>(&mut self, result: Result<T, E>) -> T {
        match result {
            Ok(value) => self.value = value,
            Err(e) => warn!("{} read failed, reusing {:?}: {e:?}", self.name, self.value),
        }
        self.value
    }
}
