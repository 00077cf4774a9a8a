use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use smabot_brokers_common::{SimulatedTerminal, SimulatedTerminalConfig};
use smabot_core::*;
use smabot_engine::{LiveConfig, LiveTrader, OrderPlacer, StopReason, StopSignal};
use smabot_strategies::SmaCrossover;
use std::future::pending;
use std::time::Duration;

fn xauusd() -> SymbolInfo {
    SymbolInfo {
        name: "XAUUSD".to_string(),
        visible: false,
        digits: 2,
        point: dec!(0.01),
        volume_min: dec!(0.01),
        volume_max: dec!(100),
        volume_step: dec!(0.01),
        trade_tick_size: dec!(0.01),
        trade_tick_value: dec!(1),
    }
}

fn simulated(closes: &[Decimal]) -> SimulatedTerminal {
    SimulatedTerminal::new(SimulatedTerminalConfig::default())
        .with_symbol(xauusd())
        .with_closes("XAUUSD", Timeframe::M1, closes)
}

fn trader(max_iterations: Option<u64>) -> LiveTrader {
    let config = LiveConfig {
        interval: Duration::ZERO,
        retry_interval: Duration::ZERO,
        max_iterations,
        ..Default::default()
    };
    LiveTrader::new(config, SmaCrossover::default(), OrderPlacer::default())
}

fn rising() -> Vec<Decimal> {
    (1..=40).map(|i| Decimal::from(i) + dec!(1900)).collect()
}

#[tokio::test]
async fn rising_closes_place_a_buy() {
    let mut sim = simulated(&rising());

    let reason = trader(Some(1)).run(&mut sim, pending()).await.unwrap();

    assert_eq!(reason, StopReason::IterationLimit);
    let orders = sim.sent_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, Side::Buy);
    assert_eq!(orders[0].volume, dec!(0.01));
    assert!(orders[0].sl < orders[0].price);
    assert_eq!(sim.shutdown_count(), 1);
    assert!(!sim.is_initialized());
}

#[tokio::test]
async fn falling_closes_place_a_sell() {
    let falling: Vec<Decimal> = rising().into_iter().rev().collect();
    let mut sim = simulated(&falling);

    trader(Some(1)).run(&mut sim, pending()).await.unwrap();

    let orders = sim.sent_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, Side::Sell);
    assert!(orders[0].sl > orders[0].price);
}

#[tokio::test]
async fn flat_closes_hold() {
    let mut sim = simulated(&[dec!(2000); 40]);

    let reason = trader(Some(3)).run(&mut sim, pending()).await.unwrap();

    assert_eq!(reason, StopReason::IterationLimit);
    assert!(sim.sent_orders().is_empty());
}

#[tokio::test]
async fn missing_data_is_retried() {
    let mut sim = simulated(&rising()).with_rates_outage(2);

    let reason = trader(Some(3)).run(&mut sim, pending()).await.unwrap();

    // Two empty passes, then one that trades.
    assert_eq!(reason, StopReason::IterationLimit);
    assert_eq!(sim.sent_orders().len(), 1);
}

#[tokio::test]
async fn unknown_symbol_keeps_looping_without_orders() {
    let mut sim = SimulatedTerminal::new(SimulatedTerminalConfig::default());

    let reason = trader(Some(2)).run(&mut sim, pending()).await.unwrap();

    assert_eq!(reason, StopReason::IterationLimit);
    assert!(sim.sent_orders().is_empty());
    assert_eq!(sim.shutdown_count(), 1);
}

#[tokio::test]
async fn account_failure_stops_the_loop() {
    let mut sim = simulated(&rising()).fail_account_after(0);

    let reason = trader(None).run(&mut sim, pending()).await.unwrap();

    assert_eq!(reason, StopReason::AccountUnavailable);
    assert!(sim.sent_orders().is_empty());
    assert_eq!(sim.shutdown_count(), 1);
}

#[tokio::test]
async fn account_failure_mid_order_skips_the_order() {
    // The loop's own account read succeeds, the placer's does not.
    let mut sim = simulated(&rising()).fail_account_after(1);

    let reason = trader(None).run(&mut sim, pending()).await.unwrap();

    assert_eq!(reason, StopReason::AccountUnavailable);
    assert!(sim.sent_orders().is_empty());
}

#[tokio::test]
async fn rates_timeout_is_retried() {
    let mut sim = simulated(&rising()).with_rates_timeouts(1);

    let reason = trader(Some(2)).run(&mut sim, pending()).await.unwrap();

    assert_eq!(reason, StopReason::IterationLimit);
    assert_eq!(sim.sent_orders().len(), 1);
    assert_eq!(sim.shutdown_count(), 1);
}

#[tokio::test]
async fn stop_raised_before_start_skips_trading() {
    let mut sim = simulated(&rising());
    let stop = StopSignal::new();
    stop.trigger();

    let reason = trader(None).run(&mut sim, stop.wait()).await.unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert!(sim.sent_orders().is_empty());
    assert_eq!(sim.shutdown_count(), 1);
    assert!(!sim.is_initialized());
}

/// Raises the stop signal from inside an iteration, while an order is sent.
struct StopOnOrder {
    inner: SimulatedTerminal,
    stop: StopSignal,
}

#[async_trait]
impl Terminal for StopOnOrder {
    async fn initialize(&mut self) -> Result<(), TerminalError> {
        self.inner.initialize().await
    }

    async fn shutdown(&mut self) -> Result<(), TerminalError> {
        self.inner.shutdown().await
    }

    fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }

    async fn account_info(&mut self) -> Result<AccountInfo, TerminalError> {
        self.inner.account_info().await
    }

    async fn symbol_info(&mut self, symbol: &str) -> Result<SymbolInfo, TerminalError> {
        self.inner.symbol_info(symbol).await
    }

    async fn symbol_select(&mut self, symbol: &str, enable: bool) -> Result<(), TerminalError> {
        self.inner.symbol_select(symbol, enable).await
    }

    async fn symbol_info_tick(&mut self, symbol: &str) -> Result<Tick, TerminalError> {
        self.inner.symbol_info_tick(symbol).await
    }

    async fn copy_rates_from_pos(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>, TerminalError> {
        self.inner
            .copy_rates_from_pos(symbol, timeframe, start_pos, count)
            .await
    }

    async fn order_send(&mut self, request: &OrderRequest) -> Result<OrderResult, TerminalError> {
        self.stop.trigger();
        self.inner.order_send(request).await
    }
}

#[tokio::test]
async fn stop_during_iteration_finishes_the_order_then_shuts_down() {
    let stop = StopSignal::new();
    let mut terminal = StopOnOrder {
        inner: simulated(&rising()),
        stop: stop.clone(),
    };

    let reason = trader(None).run(&mut terminal, stop.wait()).await.unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert_eq!(terminal.inner.sent_orders().len(), 1);
    assert_eq!(terminal.inner.shutdown_count(), 1);
}
