use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// Trading properties of a symbol as reported by the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    /// Whether the symbol is shown in Market Watch. Hidden symbols must be
    /// selected before the terminal will serve rates for them.
    pub visible: bool,
    /// Number of decimal places in a quote.
    pub digits: u32,
    /// Size of one point (e.g. 0.01 for XAUUSD with 2 digits).
    pub point: Decimal,
    pub volume_min: Decimal,
    pub volume_max: Decimal,
    pub volume_step: Decimal,
    /// Minimum price change.
    pub trade_tick_size: Decimal,
    /// Value of one tick for one lot, in account currency.
    pub trade_tick_value: Decimal,
}

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// A single OHLC bar as returned by `copy_rates_from_pos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub tick_volume: u64,
}

/// Latest prices for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub time: DateTime<Utc>,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
}

/// Bar timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeframe {
    #[default]
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    /// Bar length in seconds.
    pub fn seconds(&self) -> u64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::M30 => 1_800,
            Timeframe::H1 => 3_600,
            Timeframe::H4 => 14_400,
            Timeframe::D1 => 86_400,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// Output of the crossover strategy for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// The order side this signal asks for, if any.
    pub fn side(&self) -> Option<Side> {
        match self {
            Signal::Buy => Some(Side::Buy),
            Signal::Sell => Some(Side::Sell),
            Signal::Hold => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => f.write_str("BUY"),
            Signal::Sell => f.write_str("SELL"),
            Signal::Hold => f.write_str("HOLD"),
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Price a market order on this side executes at.
    pub fn entry_price(&self, tick: &Tick) -> Decimal {
        match self {
            Side::Buy => tick.ask,
            Side::Sell => tick.bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Kind of trade operation. Only immediate market deals are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    #[default]
    Deal,
}

/// How long an order stays active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderTimePolicy {
    /// Good till cancelled.
    #[default]
    Gtc,
    /// Good till end of the trading day.
    Day,
}

/// Volume execution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Fill or kill.
    Fok,
    /// Immediate or cancel: fill what is available, drop the rest.
    #[default]
    Ioc,
    /// Keep the remainder as a working order.
    Return,
}

/// A trade request sent to the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub action: TradeAction,
    pub symbol: String,
    pub side: Side,
    pub volume: Decimal,
    pub price: Decimal,
    /// Stop-loss price.
    pub sl: Decimal,
    /// Maximum accepted slippage, in points.
    pub deviation: u32,
    /// Tag identifying orders placed by this bot.
    pub magic: u64,
    pub comment: String,
    pub type_time: OrderTimePolicy,
    pub type_filling: FillPolicy,
}

/// Trade server return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeRetcode(pub u32);

impl TradeRetcode {
    pub const REQUOTE: TradeRetcode = TradeRetcode(10004);
    pub const REJECT: TradeRetcode = TradeRetcode(10006);
    pub const PLACED: TradeRetcode = TradeRetcode(10008);
    pub const DONE: TradeRetcode = TradeRetcode(10009);
    pub const DONE_PARTIAL: TradeRetcode = TradeRetcode(10010);
    pub const INVALID_VOLUME: TradeRetcode = TradeRetcode(10014);
    pub const INVALID_STOPS: TradeRetcode = TradeRetcode(10016);
    pub const MARKET_CLOSED: TradeRetcode = TradeRetcode(10018);
    pub const NO_MONEY: TradeRetcode = TradeRetcode(10019);

    pub fn is_done(&self) -> bool {
        *self == Self::DONE
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Self::REQUOTE => "REQUOTE",
            Self::REJECT => "REJECT",
            Self::PLACED => "PLACED",
            Self::DONE => "DONE",
            Self::DONE_PARTIAL => "DONE_PARTIAL",
            Self::INVALID_VOLUME => "INVALID_VOLUME",
            Self::INVALID_STOPS => "INVALID_STOPS",
            Self::MARKET_CLOSED => "MARKET_CLOSED",
            Self::NO_MONEY => "NO_MONEY",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for TradeRetcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// Terminal response to an `order_send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub retcode: TradeRetcode,
    /// Deal ticket, if a deal was executed.
    pub deal: u64,
    /// Order ticket, if an order was placed.
    pub order: u64,
    pub volume: Decimal,
    pub price: Decimal,
    pub comment: String,
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Snapshot of the trading account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub login: u64,
    pub balance: Decimal,
    pub equity: Decimal,
    pub currency: String,
}
