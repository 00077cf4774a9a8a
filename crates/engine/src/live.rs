use smabot_core::{Terminal, Timeframe};
use smabot_strategies::SmaCrossover;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::market_data::fetch_bars;
use crate::orders::OrderPlacer;
use crate::session::TerminalSession;
use crate::EngineError;

/// Configuration for the live trading loop.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Bars requested per iteration.
    pub bars: usize,
    /// Pause between iterations.
    pub interval: Duration,
    /// Pause after an iteration that got no market data.
    pub retry_interval: Duration,
    /// Stop after this many iterations. `None` runs until interrupted.
    pub max_iterations: Option<u64>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            symbol: "XAUUSD".to_string(),
            timeframe: Timeframe::M1,
            bars: 100,
            interval: Duration::from_secs(60),
            retry_interval: Duration::from_secs(60),
            max_iterations: None,
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Account info could not be read; the terminal is unusable.
    AccountUnavailable,
    Interrupted,
    IterationLimit,
}

/// Result of one pass through the loop body.
enum Step {
    /// Wait the normal interval.
    Done,
    /// No market data; wait the retry interval.
    NoData,
    Stop(StopReason),
}

/// Fetch → signal → order loop over a single symbol.
pub struct LiveTrader {
    config: LiveConfig,
    strategy: SmaCrossover,
    placer: OrderPlacer,
}

impl LiveTrader {
    pub fn new(config: LiveConfig, strategy: SmaCrossover, placer: OrderPlacer) -> Self {
        Self {
            config,
            strategy,
            placer,
        }
    }

    /// Open a session on `terminal`, trade until `stop` resolves or the loop
    /// ends on its own, then shut the terminal down.
    ///
    /// `stop` is only polled between iterations, so an in-flight order is
    /// never abandoned half way. If it is already resolved when the session
    /// opens, no iteration runs.
    pub async fn run<T, S>(&self, terminal: T, stop: S) -> Result<StopReason, EngineError>
    where
        T: Terminal,
        S: Future<Output = ()>,
    {
        let mut session = TerminalSession::open(terminal).await?;
        let reason = self.run_loop(session.terminal(), stop).await;
        // Shutdown errors are logged by the session; the stop reason stands.
        let _ = session.close().await;
        info!(?reason, "Trading loop stopped");
        Ok(reason)
    }

    async fn run_loop<T, S>(&self, terminal: &mut T, stop: S) -> StopReason
    where
        T: Terminal,
        S: Future<Output = ()>,
    {
        tokio::pin!(stop);
        info!(
            symbol = %self.config.symbol,
            timeframe = %self.config.timeframe,
            short = self.strategy.config().short_window,
            long = self.strategy.config().long_window,
            "Trading loop started"
        );

        let mut iterations: u64 = 0;
        let mut pause = Duration::ZERO;
        loop {
            // A stop that arrived during start-up or the last iteration wins
            // before any new terminal call.
            tokio::select! {
                biased;
                _ = &mut stop => {
                    info!("Interrupt received");
                    return StopReason::Interrupted;
                }
                _ = tokio::time::sleep(pause) => {}
            }

            pause = match self.step(terminal).await {
                Step::Stop(reason) => return reason,
                Step::Done => self.config.interval,
                Step::NoData => self.config.retry_interval,
            };

            iterations += 1;
            if self
                .config
                .max_iterations
                .is_some_and(|max| iterations >= max)
            {
                return StopReason::IterationLimit;
            }
        }
    }

    async fn step<T: Terminal>(&self, terminal: &mut T) -> Step {
        let symbol = self.config.symbol.as_str();

        let account = match terminal.account_info().await {
            Ok(account) => account,
            Err(e) => {
                error!("Failed to get account info: {}", e);
                return Step::Stop(StopReason::AccountUnavailable);
            }
        };

        let bars = match fetch_bars(terminal, symbol, self.config.timeframe, self.config.bars).await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol, "No data available ({}), retrying", e);
                return Step::NoData;
            }
        };

        let signal = self.strategy.evaluate(&bars);
        let side = match signal.side() {
            Some(side) => side,
            None => {
                info!(balance = %account.balance, "No trading signal, waiting");
                return Step::Done;
            }
        };

        info!(%signal, symbol, balance = %account.balance, "Signal");
        // The placer logs the server's answer; only unsent orders are logged here.
        if let Err(e) = self.placer.place(terminal, symbol, side).await {
            warn!(symbol, side = %side, "Order not sent: {}", e);
        }
        Step::Done
    }
}
