/// Fixed-size ring of recent heart rates.
///
/// Slots start at zero and the average always runs over every slot, so the
/// first few averages after boot are pulled towards zero until the ring has
/// been filled once.
#[derive(Debug, Clone)]
pub struct RateWindow<const N: usize> {
    rates: [u8; N],
    cursor: usize,
    written: usize,
}

impl<const N: usize> Default for RateWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RateWindow<N> {
    pub const fn new() -> Self {
        Self {
            rates: [0; N],
            cursor: 0,
            written: 0,
        }
    }

    pub fn push(&mut self, rate: u8) {
        self.rates[self.cursor] = rate;
        self.cursor = (self.cursor + 1) % N;
        self.written = self.written.saturating_add(1);
    }

    /// Integer mean over all `N` slots, including ones never written.
    pub fn average(&self) -> u8 {
        let sum: u32 = self.rates.iter().map(|&r| u32::from(r)).sum();
        (sum / N as u32) as u8
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn rates(&self) -> &[u8; N] {
        &self.rates
    }

    /// Total number of rates pushed since creation.
    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub fn is_full(&self) -> bool {
        self.written >= N
    }
}
