use serde::Deserialize;
use smabot_brokers_metatrader::MetaTraderConfig;
use smabot_core::Timeframe;
use smabot_engine::{LiveConfig, OrderConfig};
use smabot_strategies::SmaCrossoverConfig;
use std::path::Path;
use std::time::Duration;

/// Bot configuration as read from a TOML file. Every section and field is
/// optional; missing values take the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub terminal: MetaTraderConfig,
    pub strategy: StrategyConfig,
    pub orders: OrderConfig,
    #[serde(rename = "loop")]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub short_window: usize,
    pub long_window: usize,
    /// Bars fetched per iteration.
    pub bars: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let windows = SmaCrossoverConfig::default();
        Self {
            symbol: "XAUUSD".to_string(),
            timeframe: Timeframe::M1,
            short_window: windows.short_window,
            long_window: windows.long_window,
            bars: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub retry_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            retry_secs: 60,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn windows(&self) -> SmaCrossoverConfig {
        SmaCrossoverConfig {
            short_window: self.strategy.short_window,
            long_window: self.strategy.long_window,
        }
    }

    pub fn live(&self, max_iterations: Option<u64>) -> LiveConfig {
        LiveConfig {
            symbol: self.strategy.symbol.clone(),
            timeframe: self.strategy.timeframe,
            bars: self.strategy.bars,
            interval: Duration::from_secs(self.schedule.interval_secs),
            retry_interval: Duration::from_secs(self.schedule.retry_secs),
            max_iterations,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use smabot_risk::StopLossPolicy;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.strategy.symbol, "XAUUSD");
        assert_eq!(config.strategy.short_window, 10);
        assert_eq!(config.strategy.long_window, 30);
        assert_eq!(config.orders.volume, dec!(0.01));
        assert_eq!(config.orders.risk_percent, dec!(1));
        assert_eq!(config.orders.deviation, 10);
        assert_eq!(config.orders.magic, 123456);
        assert_eq!(config.terminal.port, 5556);
        assert_eq!(config.live(None).interval, Duration::from_secs(60));
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml(
            r#"
            [terminal]
            host = "10.0.0.5"
            login = 5012345

            [strategy]
            symbol = "EURUSD"
            timeframe = "M5"

            [orders]
            volume = "0.10"
            stop_loss_policy = "balance_offset"

            [loop]
            interval_secs = 300
            "#,
        )
        .unwrap();

        assert_eq!(config.terminal.host, "10.0.0.5");
        assert_eq!(config.terminal.port, 5556);
        assert_eq!(config.terminal.login, Some(5012345));
        assert_eq!(config.strategy.timeframe, Timeframe::M5);
        assert_eq!(config.strategy.long_window, 30);
        assert_eq!(config.orders.volume, dec!(0.10));
        assert_eq!(config.orders.stop_loss_policy, StopLossPolicy::BalanceOffset);
        assert_eq!(config.schedule.interval_secs, 300);
        assert_eq!(config.schedule.retry_secs, 60);

        let live = config.live(Some(5));
        assert_eq!(live.symbol, "EURUSD");
        assert_eq!(live.max_iterations, Some(5));
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let config = AppConfig::from_toml(include_str!("../../../smabot.example.toml")).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.terminal.host, defaults.terminal.host);
        assert_eq!(config.strategy.symbol, defaults.strategy.symbol);
        assert_eq!(config.strategy.bars, defaults.strategy.bars);
        assert_eq!(config.orders.volume, defaults.orders.volume);
        assert_eq!(config.orders.type_filling, defaults.orders.type_filling);
        assert_eq!(config.orders.stop_loss_policy, defaults.orders.stop_loss_policy);
        assert_eq!(config.schedule.retry_secs, defaults.schedule.retry_secs);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = AppConfig::from_toml("[strategy]\nshort_window = \"ten\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AppConfig::from_file("/nonexistent/smabot.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
