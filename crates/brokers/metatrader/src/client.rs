use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smabot_core::*;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::*;

/// Configuration for connecting to the MetaTrader 5 bridge EA.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaTraderConfig {
    /// Host address (e.g. "127.0.0.1").
    pub host: String,
    /// Port the bridge EA is listening on.
    pub port: u16,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Account to log into. `None` keeps the account the terminal is
    /// already logged into.
    pub login: Option<u64>,
    pub password: Option<String>,
    pub server: Option<String>,
}

impl Default for MetaTraderConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5556,
            timeout_secs: 10,
            login: None,
            password: None,
            server: None,
        }
    }
}

/// MetaTrader 5 terminal reached through a bridge EA.
///
/// The EA runs inside MT5, accepts one TCP client and answers each
/// length-prefixed JSON request with exactly one response carrying the same
/// id.
pub struct MetaTraderTerminal {
    config: MetaTraderConfig,
    stream: Option<TcpStream>,
    initialized: bool,
    bridge_version: Option<String>,
}

impl MetaTraderTerminal {
    pub fn new(config: MetaTraderConfig) -> Self {
        Self {
            config,
            stream: None,
            initialized: false,
            bridge_version: None,
        }
    }

    /// Version string the bridge announced on connect.
    pub fn bridge_version(&self) -> Option<&str> {
        self.bridge_version.as_deref()
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Open the TCP link, wait for the greeting and attach to the terminal.
    async fn connect(&mut self) -> Result<(), TerminalError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Connecting to MetaTrader bridge at {}", addr);

        let mut stream = tokio::time::timeout(self.timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| TerminalError::Timeout(self.config.timeout_secs))?
            .map_err(|e| TerminalError::ConnectionFailed(format!("TCP connect failed: {}", e)))?;

        let greeting: InboundMessage = tokio::time::timeout(self.timeout(), read_frame(&mut stream))
            .await
            .map_err(|_| TerminalError::Timeout(self.config.timeout_secs))?
            .map_err(frame_to_terminal)?;
        match greeting {
            InboundMessage::Connected { version } => {
                info!("Connected to MetaTrader bridge v{}", version);
                self.bridge_version = Some(version);
            }
            InboundMessage::Error { code, message, .. } => {
                return Err(TerminalError::Rejected { code, message });
            }
            other => return Err(unexpected("connect", &other)),
        }
        self.stream = Some(stream);

        let call = TerminalCall::Initialize {
            login: self.config.login,
            password: self.config.password.clone(),
            server: self.config.server.clone(),
        };
        match self.exchange(call).await {
            Ok(InboundMessage::Ok { .. }) => Ok(()),
            Ok(other) => {
                self.drop_link().await;
                Err(unexpected("initialize", &other))
            }
            Err(e) => {
                self.drop_link().await;
                Err(e)
            }
        }
    }

    /// Send one call on an initialized session, reconnecting first if the
    /// previous link was dropped.
    async fn call(&mut self, call: TerminalCall) -> Result<InboundMessage, TerminalError> {
        if !self.initialized {
            return Err(TerminalError::NotInitialized);
        }
        if self.stream.is_none() {
            warn!(call = call.name(), "Bridge link is down, reconnecting");
            self.connect().await?;
        }
        self.exchange(call).await
    }

    /// One request/response on the current link.
    ///
    /// A timeout or framing failure leaves the stream at an unknown offset,
    /// so the link is dropped and never read again.
    async fn exchange(&mut self, call: TerminalCall) -> Result<InboundMessage, TerminalError> {
        let timeout_secs = self.config.timeout_secs;
        let timeout = self.timeout();
        let name = call.name();
        let stream = self.stream.as_mut().ok_or(TerminalError::NotInitialized)?;

        let id = Uuid::new_v4();
        debug!(%id, call = name, "Sending terminal call");
        let response = round_trip(stream, &OutboundMessage { id, call }, timeout, timeout_secs).await;

        match response {
            Ok(InboundMessage::Error { code, message, .. }) => Err(error_for(code, message, name)),
            Ok(msg) => Ok(msg),
            Err(e) => {
                warn!(call = name, "Dropping bridge link: {}", e);
                self.drop_link().await;
                Err(e)
            }
        }
    }

    async fn drop_link(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }
}

/// Write `msg` and read until the response carrying its id arrives.
async fn round_trip(
    stream: &mut TcpStream,
    msg: &OutboundMessage,
    timeout: Duration,
    timeout_secs: u64,
) -> Result<InboundMessage, TerminalError> {
    write_frame(stream, msg).await.map_err(frame_to_terminal)?;

    let id = msg.id;
    tokio::time::timeout(timeout, async {
        loop {
            let msg: InboundMessage = read_frame(stream).await.map_err(frame_to_terminal)?;
            match msg.id() {
                Some(got) if got == id => return Ok::<_, TerminalError>(msg),
                // Bridge-level failure not tied to a request.
                None if matches!(msg, InboundMessage::Error { .. }) => return Ok(msg),
                other => {
                    debug!(expected = %id, got = ?other, "Skipping unrelated bridge message");
                }
            }
        }
    })
    .await
    .map_err(|_| TerminalError::Timeout(timeout_secs))?
}

fn frame_to_terminal(e: FrameError) -> TerminalError {
    match e {
        FrameError::Io(e) => TerminalError::ConnectionFailed(format!("Socket error: {}", e)),
        other => TerminalError::Protocol(other.to_string()),
    }
}

fn error_for(code: i32, message: String, call: &str) -> TerminalError {
    if code == ERR_UNKNOWN_SYMBOL {
        TerminalError::SymbolNotFound(message)
    } else {
        debug!(code, call, "Terminal call failed");
        TerminalError::Rejected { code, message }
    }
}

fn unexpected(call: &str, msg: &InboundMessage) -> TerminalError {
    TerminalError::Protocol(format!("Unexpected response to {}: {:?}", call, msg))
}

#[async_trait]
impl Terminal for MetaTraderTerminal {
    async fn initialize(&mut self) -> Result<(), TerminalError> {
        self.connect().await?;
        self.initialized = true;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), TerminalError> {
        self.initialized = false;
        if self.stream.is_none() {
            return Ok(());
        }
        let result = self.exchange(TerminalCall::Shutdown).await;
        self.drop_link().await;
        info!("Disconnected from MetaTrader");
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Bridge did not acknowledge shutdown: {}", e);
                Err(e)
            }
        }
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn account_info(&mut self) -> Result<AccountInfo, TerminalError> {
        match self.call(TerminalCall::AccountInfo).await? {
            InboundMessage::AccountInfo { account, .. } => Ok(account),
            other => Err(unexpected("account_info", &other)),
        }
    }

    async fn symbol_info(&mut self, symbol: &str) -> Result<SymbolInfo, TerminalError> {
        let call = TerminalCall::SymbolInfo {
            symbol: symbol.to_string(),
        };
        match self.call(call).await {
            Ok(InboundMessage::SymbolInfo { symbol, .. }) => Ok(symbol),
            Ok(other) => Err(unexpected("symbol_info", &other)),
            Err(TerminalError::SymbolNotFound(_)) => {
                Err(TerminalError::SymbolNotFound(symbol.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn symbol_select(&mut self, symbol: &str, enable: bool) -> Result<(), TerminalError> {
        let call = TerminalCall::SymbolSelect {
            symbol: symbol.to_string(),
            enable,
        };
        match self.call(call).await? {
            InboundMessage::Ok { .. } => Ok(()),
            other => Err(unexpected("symbol_select", &other)),
        }
    }

    async fn symbol_info_tick(&mut self, symbol: &str) -> Result<Tick, TerminalError> {
        let call = TerminalCall::SymbolInfoTick {
            symbol: symbol.to_string(),
        };
        match self.call(call).await? {
            InboundMessage::Tick { tick, .. } => Ok(tick),
            other => Err(unexpected("symbol_info_tick", &other)),
        }
    }

    async fn copy_rates_from_pos(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>, TerminalError> {
        let call = TerminalCall::CopyRatesFromPos {
            symbol: symbol.to_string(),
            timeframe,
            start_pos,
            count,
        };
        match self.call(call).await? {
            InboundMessage::Rates { mut bars, .. } => {
                // MT5 returns oldest first; keep that even if the bridge doesn't.
                bars.sort_by_key(|b| b.time);
                Ok(bars)
            }
            other => Err(unexpected("copy_rates_from_pos", &other)),
        }
    }

    async fn order_send(&mut self, request: &OrderRequest) -> Result<OrderResult, TerminalError> {
        let call = TerminalCall::OrderSend {
            request: request.clone(),
        };
        match self.call(call).await? {
            InboundMessage::OrderResult { result, .. } => Ok(result),
            other => Err(unexpected("order_send", &other)),
        }
    }
}
