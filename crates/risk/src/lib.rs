pub mod stop_loss;
pub mod volume;

pub use stop_loss::{stop_loss_price, StopLossPolicy};
pub use volume::normalize_volume;

use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    #[error("Volume {volume} is invalid for {symbol} (min {min}, max {max}, step {step})")]
    InvalidVolume {
        symbol: String,
        volume: Decimal,
        min: Decimal,
        max: Decimal,
        step: Decimal,
    },
    #[error("Invalid stop-loss: {0}")]
    InvalidStopLoss(String),
    #[error("Symbol {0} has no usable tick size/value for risk sizing")]
    MissingContractSpec(String),
}
