pub mod sma_crossover;

pub use sma_crossover::{SmaCrossover, SmaCrossoverConfig};

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("Invalid windows: short={short}, long={long} (need 0 < short < long)")]
    InvalidWindows { short: usize, long: usize },
}
