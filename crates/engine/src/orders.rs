use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smabot_core::*;
use smabot_risk::{normalize_volume, stop_loss_price, StopLossPolicy};
use tracing::{debug, info, warn};

use crate::EngineError;

/// Fixed parameters of every order the bot sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// Requested volume in lots, before broker normalization.
    pub volume: Decimal,
    /// Share of the balance put at risk by the stop-loss, in percent.
    pub risk_percent: Decimal,
    /// Maximum slippage, in points.
    pub deviation: u32,
    pub magic: u64,
    pub comment: String,
    pub stop_loss_policy: StopLossPolicy,
    pub type_time: OrderTimePolicy,
    pub type_filling: FillPolicy,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            volume: Decimal::new(1, 2), // 0.01 lot
            risk_percent: Decimal::ONE,
            deviation: 10,
            magic: 123456,
            comment: "smabot".to_string(),
            stop_loss_policy: StopLossPolicy::default(),
            type_time: OrderTimePolicy::Gtc,
            type_filling: FillPolicy::Ioc,
        }
    }
}

/// What the trade server did with an order.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    Done(OrderResult),
    /// The server answered with a non-success retcode.
    Failed(OrderResult),
}

impl OrderOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, OrderOutcome::Done(_))
    }

    pub fn result(&self) -> &OrderResult {
        match self {
            OrderOutcome::Done(r) | OrderOutcome::Failed(r) => r,
        }
    }
}

/// Builds and sends market orders.
#[derive(Debug, Clone, Default)]
pub struct OrderPlacer {
    config: OrderConfig,
}

impl OrderPlacer {
    pub fn new(config: OrderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrderConfig {
        &self.config
    }

    /// Build the market order request for `side` without sending it.
    pub async fn prepare<T: Terminal + ?Sized>(
        &self,
        terminal: &mut T,
        symbol: &str,
        side: Side,
    ) -> Result<OrderRequest, EngineError> {
        let info = terminal.symbol_info(symbol).await?;
        let volume = normalize_volume(self.config.volume, &info)?;
        if volume != self.config.volume {
            debug!(requested = %self.config.volume, %volume, "Volume adjusted to broker limits");
        }

        let tick = terminal.symbol_info_tick(symbol).await?;
        let price = side.entry_price(&tick);

        let balance = terminal.account_info().await?.balance;
        let sl = stop_loss_price(
            self.config.stop_loss_policy,
            side,
            price,
            balance,
            self.config.risk_percent,
            volume,
            &info,
        )?;

        Ok(OrderRequest {
            action: TradeAction::Deal,
            symbol: symbol.to_string(),
            side,
            volume,
            price,
            sl,
            deviation: self.config.deviation,
            magic: self.config.magic,
            comment: self.config.comment.clone(),
            type_time: self.config.type_time,
            type_filling: self.config.type_filling,
        })
    }

    /// Send a market order for `side` on `symbol`.
    ///
    /// `Err` means no order was sent (lookup failure, invalid volume or
    /// stop-loss, transport failure); a sent order always yields an
    /// [`OrderOutcome`].
    pub async fn place<T: Terminal + ?Sized>(
        &self,
        terminal: &mut T,
        symbol: &str,
        side: Side,
    ) -> Result<OrderOutcome, EngineError> {
        let request = self.prepare(terminal, symbol, side).await?;
        debug!(?request, "Order request");

        let result = terminal.order_send(&request).await?;
        if result.retcode.is_done() {
            info!(
                side = %side,
                volume = %request.volume,
                symbol,
                price = %result.price,
                sl = %request.sl,
                deal = result.deal,
                "Order placed successfully"
            );
            Ok(OrderOutcome::Done(result))
        } else {
            warn!(
                side = %side,
                symbol,
                retcode = %result.retcode,
                comment = %result.comment,
                "Order failed"
            );
            Ok(OrderOutcome::Failed(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use smabot_brokers_common::{SimulatedTerminal, SimulatedTerminalConfig};
    use smabot_risk::RiskError;

    fn xauusd() -> SymbolInfo {
        SymbolInfo {
            name: "XAUUSD".to_string(),
            visible: true,
            digits: 2,
            point: dec!(0.01),
            volume_min: dec!(0.01),
            volume_max: dec!(100),
            volume_step: dec!(0.01),
            trade_tick_size: dec!(0.01),
            trade_tick_value: dec!(1),
        }
    }

    async fn terminal(last_close: Decimal) -> SimulatedTerminal {
        let mut sim = SimulatedTerminal::new(SimulatedTerminalConfig {
            initial_balance: dec!(10000),
            spread: dec!(0.50),
            ..Default::default()
        })
        .with_symbol(xauusd())
        .with_closes("XAUUSD", Timeframe::M1, &[last_close]);
        sim.initialize().await.unwrap();
        sim
    }

    #[tokio::test]
    async fn test_buy_request_fields() {
        let mut sim = terminal(dec!(2000.00)).await;
        let placer = OrderPlacer::new(OrderConfig {
            volume: dec!(0.1),
            ..Default::default()
        });

        let request = placer.prepare(&mut sim, "XAUUSD", Side::Buy).await.unwrap();
        assert_eq!(request.price, dec!(2000.50)); // ask
        // $100 risk over 0.1 lot = 10.00 price distance.
        assert_eq!(request.sl, dec!(1990.50));
        assert_eq!(request.deviation, 10);
        assert_eq!(request.magic, 123456);
        assert_eq!(request.type_time, OrderTimePolicy::Gtc);
        assert_eq!(request.type_filling, FillPolicy::Ioc);
    }

    #[tokio::test]
    async fn test_sell_uses_bid_and_stop_above() {
        let mut sim = terminal(dec!(2000.00)).await;
        let placer = OrderPlacer::default();

        let outcome = placer.place(&mut sim, "XAUUSD", Side::Sell).await.unwrap();
        assert!(outcome.is_done());
        let sent = &sim.sent_orders()[0];
        assert_eq!(sent.price, dec!(2000.00)); // bid
        assert!(sent.sl > sent.price);
        assert_eq!(sent.volume, dec!(0.01));
    }

    #[tokio::test]
    async fn test_oversized_volume_clamped() {
        let mut sim = terminal(dec!(2000.00)).await;
        let placer = OrderPlacer::new(OrderConfig {
            volume: dec!(250),
            ..Default::default()
        });
        let outcome = placer.place(&mut sim, "XAUUSD", Side::Buy).await.unwrap();
        assert!(outcome.is_done());
        assert_eq!(outcome.result().volume, dec!(100));
    }

    #[tokio::test]
    async fn test_impossible_stop_not_sent() {
        // Legacy offset of $100 below a price of 50 would put the stop below zero.
        let mut sim = terminal(dec!(50)).await;
        let placer = OrderPlacer::new(OrderConfig {
            stop_loss_policy: StopLossPolicy::BalanceOffset,
            ..Default::default()
        });

        let err = placer.place(&mut sim, "XAUUSD", Side::Buy).await.unwrap_err();
        assert!(matches!(err, EngineError::Risk(RiskError::InvalidStopLoss(_))));
        assert!(sim.sent_orders().is_empty());
    }

    #[tokio::test]
    async fn test_server_rejection_reported() {
        let mut sim = terminal(dec!(2000.00)).await;
        let placer = OrderPlacer::default();
        let mut request = placer.prepare(&mut sim, "XAUUSD", Side::Buy).await.unwrap();
        // Stop on the wrong side is refused by the server.
        request.sl = request.price + dec!(1);
        let result = sim.order_send(&request).await.unwrap();
        assert_eq!(result.retcode, TradeRetcode::INVALID_STOPS);
    }
}
