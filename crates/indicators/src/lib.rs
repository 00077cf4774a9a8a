pub mod sma;

use rust_decimal::Decimal;

/// A streaming indicator: fed one value at a time, keeps its own window.
pub trait Indicator: Send + Sync {
    /// Feed the next value; returns the output once the window is full.
    fn next(&mut self, value: Decimal) -> Option<Decimal>;

    fn reset(&mut self);

    fn is_ready(&self) -> bool;

    /// Feed a whole series and return the value after the last element.
    /// Starts from a clean state.
    fn last_over<I>(&mut self, values: I) -> Option<Decimal>
    where
        I: IntoIterator<Item = Decimal>,
        Self: Sized,
    {
        self.reset();
        values.into_iter().fold(None, |_, v| self.next(v))
    }
}
