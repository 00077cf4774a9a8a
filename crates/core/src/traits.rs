use crate::models::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Terminal Trait
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the trading terminal.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("Terminal not initialized")]
    NotInitialized,
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
    #[error("Terminal error {code}: {message}")]
    Rejected { code: i32, message: String },
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Terminal error: {0}")]
    Other(String),
}

/// A trading terminal: the session, account, symbol, rates and trade calls
/// the bot needs. Every call is a request/response round-trip; there is no
/// streaming.
#[async_trait]
pub trait Terminal: Send {
    /// Open a session with the terminal.
    async fn initialize(&mut self) -> Result<(), TerminalError>;

    /// Close the session. Safe to call on an uninitialized terminal.
    async fn shutdown(&mut self) -> Result<(), TerminalError>;

    fn is_initialized(&self) -> bool;

    async fn account_info(&mut self) -> Result<AccountInfo, TerminalError>;

    /// Trading properties of `symbol`. Returns `SymbolNotFound` when the
    /// broker does not list it.
    async fn symbol_info(&mut self, symbol: &str) -> Result<SymbolInfo, TerminalError>;

    /// Show (`true`) or hide a symbol in Market Watch.
    async fn symbol_select(&mut self, symbol: &str, enable: bool) -> Result<(), TerminalError>;

    async fn symbol_info_tick(&mut self, symbol: &str) -> Result<Tick, TerminalError>;

    /// Copy `count` bars starting `start_pos` bars back from the current one.
    /// Bars are returned oldest first.
    async fn copy_rates_from_pos(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>, TerminalError>;

    /// Send a trade request. A returned `OrderResult` may still carry a
    /// non-success retcode; `Err` means the request never reached the
    /// trade server.
    async fn order_send(&mut self, request: &OrderRequest) -> Result<OrderResult, TerminalError>;
}

#[async_trait]
impl<'a, T: Terminal + ?Sized> Terminal for &'a mut T {
    async fn initialize(&mut self) -> Result<(), TerminalError> {
        (**self).initialize().await
    }

    async fn shutdown(&mut self) -> Result<(), TerminalError> {
        (**self).shutdown().await
    }

    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    async fn account_info(&mut self) -> Result<AccountInfo, TerminalError> {
        (**self).account_info().await
    }

    async fn symbol_info(&mut self, symbol: &str) -> Result<SymbolInfo, TerminalError> {
        (**self).symbol_info(symbol).await
    }

    async fn symbol_select(&mut self, symbol: &str, enable: bool) -> Result<(), TerminalError> {
        (**self).symbol_select(symbol, enable).await
    }

    async fn symbol_info_tick(&mut self, symbol: &str) -> Result<Tick, TerminalError> {
        (**self).symbol_info_tick(symbol).await
    }

    async fn copy_rates_from_pos(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>, TerminalError> {
        (**self)
            .copy_rates_from_pos(symbol, timeframe, start_pos, count)
            .await
    }

    async fn order_send(&mut self, request: &OrderRequest) -> Result<OrderResult, TerminalError> {
        (**self).order_send(request).await
    }
}
