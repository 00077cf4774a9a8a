use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smabot_core::{Side, SymbolInfo};
use tracing::warn;

use crate::RiskError;

/// How the stop-loss distance is derived from the account risk budget.
///
/// The budget is `risk_percent / 100 * balance`, an amount in account
/// currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopLossPolicy {
    /// Place the stop where the position loses exactly the budget:
    /// `distance = budget * tick_size / (tick_value * volume)`.
    #[default]
    RiskPerVolume,
    /// Use the budget itself as the price distance. Mixes currency and price
    /// units; kept for compatibility with older deployments.
    BalanceOffset,
}

/// Stop-loss price for a market entry at `entry`.
///
/// Always below `entry` for a buy and above it for a sell, rounded to the
/// symbol's quote precision.
pub fn stop_loss_price(
    policy: StopLossPolicy,
    side: Side,
    entry: Decimal,
    balance: Decimal,
    risk_percent: Decimal,
    volume: Decimal,
    symbol: &SymbolInfo,
) -> Result<Decimal, RiskError> {
    if risk_percent <= Decimal::ZERO || risk_percent > Decimal::ONE_HUNDRED {
        return Err(RiskError::InvalidStopLoss(format!(
            "risk percent {risk_percent} outside (0, 100]"
        )));
    }
    if balance <= Decimal::ZERO {
        return Err(RiskError::InvalidStopLoss(format!(
            "non-positive balance {balance}"
        )));
    }

    let budget = risk_percent / Decimal::ONE_HUNDRED * balance;
    let distance = match policy {
        StopLossPolicy::RiskPerVolume => {
            if symbol.trade_tick_size <= Decimal::ZERO
                || symbol.trade_tick_value <= Decimal::ZERO
                || volume <= Decimal::ZERO
            {
                return Err(RiskError::MissingContractSpec(symbol.name.clone()));
            }
            budget * symbol.trade_tick_size / (symbol.trade_tick_value * volume)
        }
        StopLossPolicy::BalanceOffset => {
            warn!(
                symbol = %symbol.name,
                %budget,
                "balance_offset stop-loss uses an account-currency amount as a price distance"
            );
            budget
        }
    };

    let stop = match side {
        Side::Buy => entry - distance,
        Side::Sell => entry + distance,
    }
    .round_dp(symbol.digits);

    let on_correct_side = match side {
        Side::Buy => stop < entry,
        Side::Sell => stop > entry,
    };
    if !on_correct_side {
        return Err(RiskError::InvalidStopLoss(format!(
            "{side} stop {stop} does not clear entry {entry}"
        )));
    }
    if stop <= Decimal::ZERO {
        return Err(RiskError::InvalidStopLoss(format!(
            "{side} stop {stop} at or below zero (entry {entry}, distance {distance})"
        )));
    }
    Ok(stop)
}
