use crate::Indicator;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple Moving Average over a fixed window.
#[derive(Debug, Clone)]
pub struct Sma {
    window: usize,
    buffer: VecDeque<Decimal>,
    sum: Decimal,
}

impl Sma {
    /// Returns `None` for a zero window.
    pub fn new(window: usize) -> Option<Self> {
        if window == 0 {
            return None;
        }
        Some(Self {
            window,
            buffer: VecDeque::with_capacity(window),
            sum: Decimal::ZERO,
        })
    }

    /// Mean of the current window, once it is full.
    pub fn value(&self) -> Option<Decimal> {
        self.is_ready().then(|| self.sum / Decimal::from(self.window))
    }
}

impl Indicator for Sma {
    fn next(&mut self, value: Decimal) -> Option<Decimal> {
        if self.is_ready() {
            // Window full: the oldest close drops out.
            self.sum -= self.buffer.pop_front().unwrap_or_default();
        }
        self.buffer.push_back(value);
        self.sum += value;
        self.value()
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.sum = Decimal::ZERO;
    }

    fn is_ready(&self) -> bool {
        self.buffer.len() == self.window
    }
}

/// Rolling mean of `values` over `window`, aligned with the input: the first
/// `window - 1` positions are `None`.
pub fn rolling_mean(values: &[Decimal], window: usize) -> Vec<Option<Decimal>> {
    match Sma::new(window) {
        Some(mut sma) => values.iter().map(|v| sma.next(*v)).collect(),
        None => vec![None; values.len()],
    }
}
