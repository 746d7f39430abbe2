use embedded_hal::delay::DelayNs;

use crate::config::{GSR_SAMPLE_COUNT, GSR_SAMPLE_DELAY_MS};

/// Averages [`GSR_SAMPLE_COUNT`] ADC reads taken [`GSR_SAMPLE_DELAY_MS`] apart.
///
/// The first failing read aborts the measurement.
pub fn read_gsr<F, E, D>(mut sample: F, delay: &mut D) -> Result<u16, E>
where
    F: FnMut() -> Result<u16, E>,
    D: DelayNs,
{
    let mut sum: u32 = 0;
    for _ in 0..GSR_SAMPLE_COUNT {
        sum += u32::from(sample()?);
        delay.delay_ms(GSR_SAMPLE_DELAY_MS);
    }
    Ok((sum / GSR_SAMPLE_COUNT) as u16)
}
