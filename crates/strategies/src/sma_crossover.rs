use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smabot_core::{Bar, Signal};
use smabot_indicators::sma::Sma;
use smabot_indicators::Indicator;
use tracing::debug;

use crate::StrategyError;

/// SMA crossover signal generator.
///
/// Compares the short and long simple moving averages of the closing prices
/// at the newest bar: short above long is a buy, short below long is a sell,
/// equal (or not enough bars for the long average) is a hold.
#[derive(Debug, Clone)]
pub struct SmaCrossover {
    config: SmaCrossoverConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmaCrossoverConfig {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for SmaCrossoverConfig {
    fn default() -> Self {
        Self {
            short_window: 10,
            long_window: 30,
        }
    }
}

/// Latest averages the signal was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Averages {
    pub short: Option<Decimal>,
    pub long: Option<Decimal>,
}

impl SmaCrossover {
    pub fn new(config: SmaCrossoverConfig) -> Result<Self, StrategyError> {
        if config.short_window == 0 || config.short_window >= config.long_window {
            return Err(StrategyError::InvalidWindows {
                short: config.short_window,
                long: config.long_window,
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SmaCrossoverConfig {
        &self.config
    }

    /// Minimum number of bars for a defined signal.
    pub fn required_bars(&self) -> usize {
        self.config.long_window
    }

    /// Short and long SMA at the newest bar. `bars` must be oldest first.
    pub fn averages(&self, bars: &[Bar]) -> Averages {
        let closes = || bars.iter().map(|b| b.close);
        Averages {
            short: Sma::new(self.config.short_window).and_then(|mut sma| sma.last_over(closes())),
            long: Sma::new(self.config.long_window).and_then(|mut sma| sma.last_over(closes())),
        }
    }

    pub fn evaluate(&self, bars: &[Bar]) -> Signal {
        let averages = self.averages(bars);
        let (short, long) = match (averages.short, averages.long) {
            (Some(s), Some(l)) => (s, l),
            _ => {
                debug!(
                    bars = bars.len(),
                    required = self.required_bars(),
                    "Not enough bars for both averages, holding"
                );
                return Signal::Hold;
            }
        };

        let signal = if short > long {
            Signal::Buy
        } else if short < long {
            Signal::Sell
        } else {
            Signal::Hold
        };
        debug!(%short, %long, %signal, "SMA crossover evaluated");
        signal
    }
}

impl Default for SmaCrossover {
    fn default() -> Self {
        Self {
            config: SmaCrossoverConfig::default(),
        }
    }
}
