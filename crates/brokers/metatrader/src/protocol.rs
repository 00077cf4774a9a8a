use serde::{Deserialize, Serialize};
use smabot_core::{AccountInfo, Bar, OrderRequest, OrderResult, SymbolInfo, Tick, Timeframe};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

/// Upper bound on a single frame body. Rates responses for a few hundred
/// bars are well under this.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// MQL5 `ERR_MARKET_UNKNOWN_SYMBOL`.
pub const ERR_UNKNOWN_SYMBOL: i32 = 4301;

/// A request sent to the MT5 bridge EA. The `id` is echoed in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: Uuid,
    #[serde(flatten)]
    pub call: TerminalCall,
}

/// Terminal functions exposed by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TerminalCall {
    /// Attach to the terminal, optionally logging into a specific account.
    #[serde(rename = "initialize")]
    Initialize {
        login: Option<u64>,
        password: Option<String>,
        server: Option<String>,
    },
    #[serde(rename = "shutdown")]
    Shutdown,
    #[serde(rename = "account_info")]
    AccountInfo,
    #[serde(rename = "symbol_info")]
    SymbolInfo { symbol: String },
    #[serde(rename = "symbol_select")]
    SymbolSelect { symbol: String, enable: bool },
    #[serde(rename = "symbol_info_tick")]
    SymbolInfoTick { symbol: String },
    #[serde(rename = "copy_rates_from_pos")]
    CopyRatesFromPos {
        symbol: String,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    },
    #[serde(rename = "order_send")]
    OrderSend { request: OrderRequest },
}

impl TerminalCall {
    pub fn name(&self) -> &'static str {
        match self {
            TerminalCall::Initialize { .. } => "initialize",
            TerminalCall::Shutdown => "shutdown",
            TerminalCall::AccountInfo => "account_info",
            TerminalCall::SymbolInfo { .. } => "symbol_info",
            TerminalCall::SymbolSelect { .. } => "symbol_select",
            TerminalCall::SymbolInfoTick { .. } => "symbol_info_tick",
            TerminalCall::CopyRatesFromPos { .. } => "copy_rates_from_pos",
            TerminalCall::OrderSend { .. } => "order_send",
        }
    }
}

/// Messages received from the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Greeting sent once when the socket is accepted.
    #[serde(rename = "connected")]
    Connected { version: String },
    /// Success with no payload (initialize, shutdown, symbol_select).
    #[serde(rename = "ok")]
    Ok { id: Uuid },
    #[serde(rename = "account_info")]
    AccountInfo { id: Uuid, account: AccountInfo },
    #[serde(rename = "symbol_info")]
    SymbolInfo { id: Uuid, symbol: SymbolInfo },
    #[serde(rename = "tick")]
    Tick { id: Uuid, tick: Tick },
    #[serde(rename = "rates")]
    Rates { id: Uuid, bars: Vec<Bar> },
    #[serde(rename = "order_result")]
    OrderResult { id: Uuid, result: OrderResult },
    /// A failed call; `code` is the terminal's `GetLastError()` value.
    #[serde(rename = "error")]
    Error {
        id: Option<Uuid>,
        code: i32,
        message: String,
    },
}

impl InboundMessage {
    /// Request id this message answers, if any.
    pub fn id(&self) -> Option<Uuid> {
        match self {
            InboundMessage::Connected { .. } => None,
            InboundMessage::Ok { id }
            | InboundMessage::AccountInfo { id, .. }
            | InboundMessage::SymbolInfo { id, .. }
            | InboundMessage::Tick { id, .. }
            | InboundMessage::Rates { id, .. }
            | InboundMessage::OrderResult { id, .. } => Some(*id),
            InboundMessage::Error { id, .. } => *id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Frame of {0} bytes exceeds the size limit")]
    TooLarge(usize),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Frame a message with a 4-byte length prefix (big-endian).
pub fn frame_message(msg: &[u8]) -> Vec<u8> {
    let len = msg.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(msg);
    framed
}

/// Serialize `msg` and write it as one frame.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(msg)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(body.len()));
    }
    writer.write_all(&frame_message(&body)).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame and deserialize its body.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body)?)
}
