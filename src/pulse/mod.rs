//! Heart rate from raw infrared samples.
//!
//! [`BpmAggregator`] is fed one IR sample per poll. When the beat detector
//! flags an edge, the time since the previous edge becomes an instantaneous
//! BPM value which, if plausible, goes into a four-slot [`RateWindow`] that
//! produces the reported average.

pub mod beat;
pub mod rate_window;

pub use beat::{BeatDetector, PeakBeatDetector};
pub use rate_window::RateWindow;

use crate::config::{FINGER_IR_THRESHOLD, MAX_PLAUSIBLE_BPM, MIN_PLAUSIBLE_BPM, RATE_SIZE};

/// Anything that can hand out raw infrared intensity samples.
pub trait InfraredSource {
    type Error;

    fn sample_infrared(&mut self) -> Result<u32, Self::Error>;
}

/// Result of a single [`BpmAggregator::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub bpm: f32,
    pub avg_bpm: u8,
    /// `true` while the IR value is below [`FINGER_IR_THRESHOLD`].
    pub finger_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// No plausible beat accepted yet.
    Idle,
    Tracking,
}

/// Why a detected edge did not make it into the rate window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    ZeroInterval,
    Implausible(f32),
}

pub fn finger_present(ir: u32) -> bool {
    ir < FINGER_IR_THRESHOLD
}

/// Instantaneous BPM for an interval, or why it cannot be used.
pub fn bpm_from_interval(delta_ms: u32) -> Result<f32, Rejection> {
    if delta_ms == 0 {
        return Err(Rejection::ZeroInterval);
    }
    let bpm = 60_000.0 / delta_ms as f32;
    if bpm > MIN_PLAUSIBLE_BPM && bpm < MAX_PLAUSIBLE_BPM {
        Ok(bpm)
    } else {
        Err(Rejection::Implausible(bpm))
    }
}

#[derive(Debug, Clone)]
pub struct BpmAggregator<D = PeakBeatDetector> {
    detector: D,
    window: RateWindow<RATE_SIZE>,
    last_beat_ms: u32,
    bpm: f32,
    avg_bpm: u8,
    state: TrackingState,
}

impl Default for BpmAggregator<PeakBeatDetector> {
    fn default() -> Self {
        Self::new(PeakBeatDetector::new())
    }
}

impl<D: BeatDetector> BpmAggregator<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            window: RateWindow::new(),
            last_beat_ms: 0,
            bpm: 0.0,
            avg_bpm: 0,
            state: TrackingState::Idle,
        }
    }

    /// Folds one IR sample taken at `now_ms` (milliseconds since boot).
    pub fn update(&mut self, ir: u32, now_ms: u32) -> Reading {
        if self.detector.is_beat_edge(ir) {
            // wrapping keeps the interval right across the u32 millisecond rollover
            let delta = now_ms.wrapping_sub(self.last_beat_ms);
            self.last_beat_ms = now_ms;

            match bpm_from_interval(delta) {
                Ok(bpm) => self.accept(bpm),
                Err(Rejection::ZeroInterval) => {
                    log::debug!("Beat edge with zero interval at {now_ms} ms, skipped");
                }
                Err(Rejection::Implausible(bpm)) => {
                    log::debug!("Discarding implausible BPM {bpm:.1}");
                }
            }
        }
        self.reading(ir)
    }

    fn accept(&mut self, bpm: f32) {
        self.bpm = bpm;
        self.window.push(bpm as u8);
        self.avg_bpm = self.window.average();
        self.state = TrackingState::Tracking;
    }

    fn reading(&self, ir: u32) -> Reading {
        Reading {
            bpm: self.bpm,
            avg_bpm: self.avg_bpm,
            finger_present: finger_present(ir),
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn avg_bpm(&self) -> u8 {
        self.avg_bpm
    }

    pub fn last_beat_ms(&self) -> u32 {
        self.last_beat_ms
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn window(&self) -> &RateWindow<RATE_SIZE> {
        &self.window
    }
}
