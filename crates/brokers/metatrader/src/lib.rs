//! MetaTrader 5 terminal adapter.
//!
//! Talks to an MQL5 bridge EA running inside the MT5 terminal over TCP,
//! using length-prefixed JSON request/response messages.

pub mod client;
pub mod protocol;

pub use client::{MetaTraderConfig, MetaTraderTerminal};
