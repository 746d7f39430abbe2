/// Decides whether an infrared sample is a heartbeat edge.
pub trait BeatDetector {
    fn is_beat_edge(&mut self, sample: u32) -> bool;
}

impl<F> BeatDetector for F
where
    F: FnMut(u32) -> bool,
{
    fn is_beat_edge(&mut self, sample: u32) -> bool {
        self(sample)
    }
}

const FIR_COEFFS: [i16; 12] = [
    172, 321, 579, 927, 1360, 1858, 2390, 2916, 3391, 3768, 4012, 4096,
];
const FIR_BUFFER_LEN: usize = 32;

/// Peak based beat detection for MAX3010x IR data.
///
/// The DC level is tracked with a slow integrator and removed, the remaining
/// AC signal is smoothed with a low-pass FIR and every rising zero crossing
/// whose preceding cycle had a sane peak-to-peak swing counts as a beat.
/// Arithmetic is 16/32-bit fixed point, so samples are truncated to 16 bits
/// like the sensor vendor's reference implementation.
#[derive(Debug, Clone)]
pub struct PeakBeatDetector {
    ac_max: i16,
    ac_min: i16,
    ac_current: i16,
    ac_previous: i16,
    cycle_min: i16,
    cycle_max: i16,
    positive_edge: bool,
    negative_edge: bool,
    dc_register: i32,
    fir_buffer: [i16; FIR_BUFFER_LEN],
    fir_offset: usize,
}

impl Default for PeakBeatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PeakBeatDetector {
    /// Accepted peak-to-peak swing of the previous cycle, exclusive.
    const MIN_SWING: i16 = 20;
    const MAX_SWING: i16 = 1000;

    pub const fn new() -> Self {
        Self {
            ac_max: 20,
            ac_min: -20,
            ac_current: 0,
            ac_previous: 0,
            cycle_min: 0,
            cycle_max: 0,
            positive_edge: false,
            negative_edge: false,
            dc_register: 0,
            fir_buffer: [0; FIR_BUFFER_LEN],
            fir_offset: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Last filtered AC value, mostly useful for plotting.
    pub fn ac_signal(&self) -> i16 {
        self.ac_current
    }

    fn estimate_dc(&mut self, x: u16) -> i16 {
        let target = (i32::from(x)).wrapping_shl(15);
        self.dc_register = self
            .dc_register
            .wrapping_add(target.wrapping_sub(self.dc_register) >> 4);
        (self.dc_register >> 15) as i16
    }

    fn low_pass(&mut self, din: i16) -> i16 {
        let offset = self.fir_offset;
        let tap = |back: usize| offset.wrapping_sub(back) & (FIR_BUFFER_LEN - 1);

        self.fir_buffer[offset] = din;
        let mut z = i32::from(FIR_COEFFS[11]) * i32::from(self.fir_buffer[tap(11)]);
        for (i, &coeff) in FIR_COEFFS.iter().enumerate().take(11) {
            z = z.wrapping_add(i32::from(coeff) * i32::from(self.fir_buffer[tap(i)]));
            z = z.wrapping_add(i32::from(coeff) * i32::from(self.fir_buffer[tap(22 - i)]));
        }
        self.fir_offset = (offset + 1) % FIR_BUFFER_LEN;
        (z >> 15) as i16
    }
}

impl BeatDetector for PeakBeatDetector {
    fn is_beat_edge(&mut self, sample: u32) -> bool {
        let mut beat = false;

        self.ac_previous = self.ac_current;
        let dc = self.estimate_dc(sample as u16);
        let ac_in = (sample as i32).wrapping_sub(i32::from(dc)) as i16;
        self.ac_current = self.low_pass(ac_in);

        // rising zero crossing
        if self.ac_previous < 0 && self.ac_current >= 0 {
            self.ac_max = self.cycle_max;
            self.ac_min = self.cycle_min;
            self.positive_edge = true;
            self.negative_edge = false;
            self.cycle_max = 0;

            let swing = self.ac_max.wrapping_sub(self.ac_min);
            if swing > Self::MIN_SWING && swing < Self::MAX_SWING {
                beat = true;
            }
        }

        // falling zero crossing
        if self.ac_previous > 0 && self.ac_current <= 0 {
            self.positive_edge = false;
            self.negative_edge = true;
            self.cycle_min = 0;
        }

        if self.positive_edge && self.ac_current > self.ac_previous {
            self.cycle_max = self.ac_current;
        }
        if self.negative_edge && self.ac_current < self.ac_previous {
            self.cycle_min = self.ac_current;
        }

        beat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE_HZ: f32 = 100.0;

    fn synthetic_pulse(bpm: f32, dc: f32, amplitude: f32, seconds: f32) -> Vec<u32> {
        let count = (SAMPLE_RATE_HZ * seconds) as usize;
        let freq = bpm / 60.0;
        (0..count)
            .map(|n| {
                let t = n as f32 / SAMPLE_RATE_HZ;
                (dc + amplitude * (2.0 * core::f32::consts::PI * freq * t).sin()) as u32
            })
            .collect()
    }

    #[test]
    fn flat_signal_has_no_beats() {
        let mut detector = PeakBeatDetector::new();
        let beats = (0..2000).filter(|_| detector.is_beat_edge(20_000)).count();
        assert_eq!(beats, 0);
    }

    #[test]
    fn finds_beats_in_synthetic_pulse() {
        let mut detector = PeakBeatDetector::new();
        let samples = synthetic_pulse(72.0, 20_000.0, 200.0, 10.0);
        let beat_indices: Vec<usize> = samples
            .iter()
            .enumerate()
            .filter(|(_, &s)| detector.is_beat_edge(s))
            .map(|(i, _)| i)
            .collect();

        assert!(
            (8..=13).contains(&beat_indices.len()),
            "unexpected beat count {}",
            beat_indices.len()
        );
        for pair in beat_indices.windows(2) {
            let period_ms = (pair[1] - pair[0]) as f32 * 1000.0 / SAMPLE_RATE_HZ;
            let bpm = 60_000.0 / period_ms;
            assert!((65.0..80.0).contains(&bpm), "bpm {bpm} out of range");
        }
    }

    #[test]
    fn closures_act_as_detectors() {
        let mut toggle = false;
        let mut detector = move |_sample: u32| {
            toggle = !toggle;
            toggle
        };
        assert!(detector.is_beat_edge(0));
        assert!(!detector.is_beat_edge(0));
    }

    #[test]
    fn reset_restores_power_on_state() {
        let mut detector = PeakBeatDetector::new();
        for s in synthetic_pulse(72.0, 20_000.0, 200.0, 1.0) {
            detector.is_beat_edge(s);
        }
        detector.reset();
        assert_eq!(detector.ac_signal(), 0);
        assert_eq!(detector.dc_register, 0);
    }
}
