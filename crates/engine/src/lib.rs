pub mod live;
pub mod market_data;
pub mod orders;
pub mod session;
pub mod stop;

pub use live::{LiveConfig, LiveTrader, StopReason};
pub use orders::{OrderConfig, OrderOutcome, OrderPlacer};
pub use session::TerminalSession;
pub use stop::StopSignal;

use smabot_core::TerminalError;
use smabot_risk::RiskError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Terminal(#[from] TerminalError),
    #[error("No data available for {0}")]
    NoData(String),
    #[error(transparent)]
    Risk(#[from] RiskError),
}
