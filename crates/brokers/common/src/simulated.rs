use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use smabot_core::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// Configuration for the simulated terminal.
#[derive(Debug, Clone)]
pub struct SimulatedTerminalConfig {
    pub login: u64,
    pub initial_balance: Decimal,
    pub currency: String,
    /// Ask minus bid.
    pub spread: Decimal,
}

impl Default for SimulatedTerminalConfig {
    fn default() -> Self {
        Self {
            login: 1,
            initial_balance: Decimal::new(10_000, 0),
            currency: "USD".to_string(),
            spread: Decimal::new(20, 2), // 0.20
        }
    }
}

/// Triangle-wave price path used to produce a new bar on every rates request.
#[derive(Debug, Clone)]
struct PricePath {
    base: Decimal,
    step: Decimal,
    /// Bars from trough to peak.
    half_period: u32,
    index: u32,
    timeframe: Timeframe,
}

impl PricePath {
    fn next_close(&mut self) -> Decimal {
        let phase = self.index % (2 * self.half_period);
        let offset = if phase < self.half_period {
            phase
        } else {
            2 * self.half_period - phase
        };
        self.index += 1;
        self.base + self.step * Decimal::from(offset)
    }
}

/// An in-memory terminal.
///
/// Serves bars and ticks from a per-symbol history, fills every valid market
/// order at the current tick and records what it was sent. Failure switches
/// let callers exercise outage paths.
pub struct SimulatedTerminal {
    config: SimulatedTerminalConfig,
    initialized: bool,
    account: AccountInfo,
    symbols: HashMap<String, SymbolInfo>,
    bars: HashMap<String, Vec<Bar>>,
    paths: HashMap<String, PricePath>,
    sent: Vec<OrderRequest>,
    next_ticket: u64,
    shutdowns: usize,
    /// Remaining successful `account_info` calls before it starts failing.
    account_budget: Option<usize>,
    /// Number of upcoming rates requests that return no bars.
    rates_outages: usize,
    /// Number of upcoming rates requests that time out.
    rates_timeouts: usize,
}

impl SimulatedTerminal {
    pub fn new(config: SimulatedTerminalConfig) -> Self {
        let account = AccountInfo {
            login: config.login,
            balance: config.initial_balance,
            equity: config.initial_balance,
            currency: config.currency.clone(),
        };
        Self {
            config,
            initialized: false,
            account,
            symbols: HashMap::new(),
            bars: HashMap::new(),
            paths: HashMap::new(),
            sent: Vec::new(),
            next_ticket: 1,
            shutdowns: 0,
            account_budget: None,
            rates_outages: 0,
            rates_timeouts: 0,
        }
    }

    /// List a symbol with the broker.
    pub fn with_symbol(mut self, info: SymbolInfo) -> Self {
        self.symbols.insert(info.name.clone(), info);
        self
    }

    /// Seed the bar history of `symbol` (oldest first).
    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    /// Seed history from closing prices, one bar per `timeframe` ending now.
    pub fn with_closes(self, symbol: &str, timeframe: Timeframe, closes: &[Decimal]) -> Self {
        let bar_len = Duration::seconds(timeframe.seconds() as i64);
        let start = Utc::now() - bar_len * closes.len() as i32;
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, close)| flat_bar(start + bar_len * i as i32, *close))
            .collect();
        self.with_bars(symbol, bars)
    }

    /// Append a freshly generated bar to `symbol` on every rates request,
    /// walking a triangle wave between `base` and `base + step * half_period`.
    pub fn with_price_path(
        mut self,
        symbol: &str,
        timeframe: Timeframe,
        base: Decimal,
        step: Decimal,
        half_period: u32,
    ) -> Self {
        self.paths.insert(
            symbol.to_string(),
            PricePath {
                base,
                step,
                half_period: half_period.max(1),
                index: 0,
                timeframe,
            },
        );
        self
    }

    /// Let `account_info` succeed `calls` more times, then fail.
    pub fn fail_account_after(mut self, calls: usize) -> Self {
        self.account_budget = Some(calls);
        self
    }

    /// Make the next `requests` rates requests come back empty.
    pub fn with_rates_outage(mut self, requests: usize) -> Self {
        self.rates_outages = requests;
        self
    }

    /// Make the next `requests` rates requests fail as if the link timed out.
    pub fn with_rates_timeouts(mut self, requests: usize) -> Self {
        self.rates_timeouts = requests;
        self
    }

    /// Every request passed to `order_send`, in order.
    pub fn sent_orders(&self) -> &[OrderRequest] {
        &self.sent
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns
    }

    fn ensure_initialized(&self) -> Result<(), TerminalError> {
        if self.initialized {
            Ok(())
        } else {
            Err(TerminalError::NotInitialized)
        }
    }

    fn symbol(&self, symbol: &str) -> Result<&SymbolInfo, TerminalError> {
        self.symbols
            .get(symbol)
            .ok_or_else(|| TerminalError::SymbolNotFound(symbol.to_string()))
    }

    fn advance_path(&mut self, symbol: &str) {
        if let Some(path) = self.paths.get_mut(symbol) {
            let close = path.next_close();
            let bar_len = Duration::seconds(path.timeframe.seconds() as i64);
            let history = self.bars.entry(symbol.to_string()).or_default();
            let time = history
                .last()
                .map(|b| b.time + bar_len)
                .unwrap_or_else(Utc::now);
            history.push(flat_bar(time, close));
        }
    }

    fn tick_for(&self, symbol: &str) -> Option<Tick> {
        let last = self.bars.get(symbol)?.last()?;
        Some(Tick {
            time: last.time,
            bid: last.close,
            ask: last.close + self.config.spread,
            last: last.close,
        })
    }

    fn reject(&self, retcode: TradeRetcode, comment: &str) -> OrderResult {
        OrderResult {
            retcode,
            deal: 0,
            order: 0,
            volume: Decimal::ZERO,
            price: Decimal::ZERO,
            comment: comment.to_string(),
        }
    }
}

fn flat_bar(time: DateTime<Utc>, close: Decimal) -> Bar {
    Bar {
        time,
        open: close,
        high: close,
        low: close,
        close,
        tick_volume: 1,
    }
}

#[async_trait]
impl Terminal for SimulatedTerminal {
    async fn initialize(&mut self) -> Result<(), TerminalError> {
        self.initialized = true;
        info!(login = self.account.login, "Simulated terminal initialized");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), TerminalError> {
        self.initialized = false;
        self.shutdowns += 1;
        info!("Simulated terminal shut down");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn account_info(&mut self) -> Result<AccountInfo, TerminalError> {
        self.ensure_initialized()?;
        if let Some(budget) = self.account_budget.as_mut() {
            if *budget == 0 {
                return Err(TerminalError::Rejected {
                    code: -10004,
                    message: "No IPC connection".to_string(),
                });
            }
            *budget -= 1;
        }
        Ok(self.account.clone())
    }

    async fn symbol_info(&mut self, symbol: &str) -> Result<SymbolInfo, TerminalError> {
        self.ensure_initialized()?;
        self.symbol(symbol).cloned()
    }

    async fn symbol_select(&mut self, symbol: &str, enable: bool) -> Result<(), TerminalError> {
        self.ensure_initialized()?;
        let info = self
            .symbols
            .get_mut(symbol)
            .ok_or_else(|| TerminalError::SymbolNotFound(symbol.to_string()))?;
        info.visible = enable;
        Ok(())
    }

    async fn symbol_info_tick(&mut self, symbol: &str) -> Result<Tick, TerminalError> {
        self.ensure_initialized()?;
        self.symbol(symbol)?;
        self.tick_for(symbol).ok_or_else(|| TerminalError::Rejected {
            code: -1,
            message: format!("No prices for {}", symbol),
        })
    }

    async fn copy_rates_from_pos(
        &mut self,
        symbol: &str,
        _timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>, TerminalError> {
        self.ensure_initialized()?;
        if !self.symbol(symbol)?.visible {
            return Err(TerminalError::Rejected {
                code: -1,
                message: format!("{} is not selected in Market Watch", symbol),
            });
        }
        if self.rates_timeouts > 0 {
            self.rates_timeouts -= 1;
            debug!(symbol, "Simulated rates timeout");
            return Err(TerminalError::Timeout(10));
        }
        if self.rates_outages > 0 {
            self.rates_outages -= 1;
            debug!(symbol, "Simulated rates outage");
            return Ok(Vec::new());
        }

        self.advance_path(symbol);
        let history = self.bars.get(symbol).map(Vec::as_slice).unwrap_or_default();
        let end = history.len().saturating_sub(start_pos);
        let begin = end.saturating_sub(count);
        Ok(history[begin..end].to_vec())
    }

    async fn order_send(&mut self, request: &OrderRequest) -> Result<OrderResult, TerminalError> {
        self.ensure_initialized()?;
        self.sent.push(request.clone());
        let info = self.symbol(&request.symbol)?.clone();

        let tick = match self.tick_for(&request.symbol) {
            Some(tick) => tick,
            None => return Ok(self.reject(TradeRetcode::MARKET_CLOSED, "Market closed")),
        };

        let on_step = (request.volume % info.volume_step).is_zero();
        if request.volume < info.volume_min || request.volume > info.volume_max || !on_step {
            return Ok(self.reject(TradeRetcode::INVALID_VOLUME, "Invalid volume"));
        }

        let price = request.side.entry_price(&tick);
        let stops_ok = match request.side {
            Side::Buy => request.sl < price,
            Side::Sell => request.sl > price,
        };
        if !stops_ok {
            return Ok(self.reject(TradeRetcode::INVALID_STOPS, "Invalid stops"));
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        info!(
            ticket,
            side = %request.side,
            volume = %request.volume,
            %price,
            "Simulated fill"
        );
        Ok(OrderResult {
            retcode: TradeRetcode::DONE,
            deal: ticket,
            order: ticket,
            volume: request.volume,
            price,
            comment: "Request executed".to_string(),
        })
    }
}
