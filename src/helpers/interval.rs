/// Fires at most once per `period_ms` on a wrapping millisecond clock.
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period_ms: u32,
    last_ms: u32,
}

impl Interval {
    pub fn new(period_ms: u32, now_ms: u32) -> Self {
        Self {
            period_ms,
            last_ms: now_ms,
        }
    }

    pub fn is_due(&mut self, now_ms: u32) -> bool {
        if now_ms.wrapping_sub(self.last_ms) >= self.period_ms {
            self.last_ms = now_ms;
            true
        } else {
            false
        }
    }
}
