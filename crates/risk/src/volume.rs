use rust_decimal::Decimal;
use smabot_core::SymbolInfo;

use crate::RiskError;

/// Fit a requested volume to the broker's constraints for `symbol`.
///
/// The volume is clamped to `[volume_min, volume_max]` and then rounded to
/// the nearest multiple of `volume_step` (ties to even). Rounding can land
/// outside the bounds when a bound is not itself a step multiple; that, and
/// a non-positive step, is an error.
pub fn normalize_volume(requested: Decimal, symbol: &SymbolInfo) -> Result<Decimal, RiskError> {
    let invalid = |volume: Decimal| RiskError::InvalidVolume {
        symbol: symbol.name.clone(),
        volume,
        min: symbol.volume_min,
        max: symbol.volume_max,
        step: symbol.volume_step,
    };

    if symbol.volume_step <= Decimal::ZERO || symbol.volume_min > symbol.volume_max {
        return Err(invalid(requested));
    }

    let clamped = requested.min(symbol.volume_max).max(symbol.volume_min);
    let volume = ((clamped / symbol.volume_step).round() * symbol.volume_step).normalize();

    if volume < symbol.volume_min || volume > symbol.volume_max || volume <= Decimal::ZERO {
        return Err(invalid(volume));
    }
    Ok(volume)
}
