use smabot_core::{Bar, Terminal, TerminalError, Timeframe};
use tracing::{debug, info};

use crate::EngineError;

/// Fetch the last `count` bars of `symbol`, oldest first.
///
/// Makes the symbol visible in Market Watch first if the terminal has it
/// hidden, since hidden symbols serve no rates.
pub async fn fetch_bars<T: Terminal + ?Sized>(
    terminal: &mut T,
    symbol: &str,
    timeframe: Timeframe,
    count: usize,
) -> Result<Vec<Bar>, EngineError> {
    let info = terminal.symbol_info(symbol).await?;
    if !info.visible {
        info!(symbol, "Symbol hidden, selecting it in Market Watch");
        terminal.symbol_select(symbol, true).await?;
    }

    let bars = match terminal.copy_rates_from_pos(symbol, timeframe, 0, count).await {
        Ok(bars) => bars,
        Err(e @ TerminalError::SymbolNotFound(_)) => return Err(e.into()),
        Err(e) => {
            debug!(symbol, "Rates request failed: {}", e);
            return Err(EngineError::NoData(symbol.to_string()));
        }
    };
    if bars.is_empty() {
        return Err(EngineError::NoData(symbol.to_string()));
    }

    debug!(symbol, %timeframe, bars = bars.len(), "Fetched bars");
    Ok(bars)
}
