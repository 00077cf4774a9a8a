mod config;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use smabot_brokers_common::{SimulatedTerminal, SimulatedTerminalConfig};
use smabot_brokers_metatrader::MetaTraderTerminal;
use smabot_core::{SymbolInfo, Terminal};
use smabot_engine::{LiveTrader, OrderPlacer, StopReason, StopSignal};
use smabot_risk::StopLossPolicy;
use smabot_strategies::SmaCrossover;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "smabot")]
#[command(about = "SMA crossover trading bot for MetaTrader 5")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Symbol to trade (e.g. "XAUUSD")
    #[arg(short, long)]
    symbol: Option<String>,

    /// Requested volume per order, in lots
    #[arg(long)]
    volume: Option<Decimal>,

    /// Share of the balance risked by the stop-loss, in percent
    #[arg(long)]
    risk_percent: Option<Decimal>,

    /// How the stop-loss distance is derived
    #[arg(long, value_enum)]
    stop_loss: Option<StopLossArg>,

    /// Bridge EA host
    #[arg(long, env = "SMABOT_HOST")]
    host: Option<String>,

    /// Bridge EA port
    #[arg(long, env = "SMABOT_PORT")]
    port: Option<u16>,

    /// Trade against the built-in simulated terminal instead of MT5
    #[arg(long)]
    paper: bool,

    /// Stop after this many loop iterations
    #[arg(long)]
    iterations: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StopLossArg {
    RiskPerVolume,
    BalanceOffset,
}

impl From<StopLossArg> for StopLossPolicy {
    fn from(arg: StopLossArg) -> Self {
        match arg {
            StopLossArg::RiskPerVolume => StopLossPolicy::RiskPerVolume,
            StopLossArg::BalanceOffset => StopLossPolicy::BalanceOffset,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let subscriber = fmt().with_env_filter(filter).with_target(false);
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let config = load_config(&cli)?;

    let strategy = SmaCrossover::new(config.windows()).context("Invalid strategy windows")?;
    let trader = LiveTrader::new(
        config.live(cli.iterations),
        strategy,
        OrderPlacer::new(config.orders.clone()),
    );

    info!(
        symbol = %config.strategy.symbol,
        volume = %config.orders.volume,
        risk_percent = %config.orders.risk_percent,
        paper = cli.paper,
        "Starting smabot"
    );

    // Installed before the terminal is touched, so an early Ctrl-C still
    // ends in a clean shutdown.
    let stop = StopSignal::new();
    listen_for_interrupt(stop.clone()).await?;

    let reason = if cli.paper {
        run(&trader, paper_terminal(&config), &stop).await?
    } else {
        let terminal = MetaTraderTerminal::new(config.terminal.clone());
        run(&trader, terminal, &stop).await?
    };

    if reason == StopReason::AccountUnavailable {
        warn!("Stopped because the account could not be read");
    }
    Ok(())
}

/// Read the config file (if any) and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    if let Some(symbol) = &cli.symbol {
        config.strategy.symbol = symbol.clone();
    }
    if let Some(volume) = cli.volume {
        config.orders.volume = volume;
    }
    if let Some(risk) = cli.risk_percent {
        config.orders.risk_percent = risk;
    }
    if let Some(policy) = cli.stop_loss {
        config.orders.stop_loss_policy = policy.into();
    }
    if let Some(host) = &cli.host {
        config.terminal.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.terminal.port = port;
    }
    Ok(config)
}

async fn run<T: Terminal>(
    trader: &LiveTrader,
    terminal: T,
    stop: &StopSignal,
) -> Result<StopReason> {
    trader
        .run(terminal, stop.wait())
        .await
        .context("Failed to start the terminal session")
}

/// Trigger `stop` on SIGINT or SIGTERM. The handlers are registered before
/// this returns.
#[cfg(unix)]
async fn listen_for_interrupt(stop: StopSignal) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).context("Cannot listen for SIGINT")?;
    let mut terminate = signal(SignalKind::terminate()).context("Cannot listen for SIGTERM")?;
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Ctrl-C received, stopping after the current iteration"),
            _ = terminate.recv() => info!("SIGTERM received, stopping after the current iteration"),
        }
        stop.trigger();
    });
    Ok(())
}

/// Trigger `stop` on Ctrl-C.
#[cfg(not(unix))]
async fn listen_for_interrupt(stop: StopSignal) -> Result<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping after the current iteration");
                stop.trigger();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });
    // Let the listener register its handler before the session opens.
    tokio::task::yield_now().await;
    Ok(())
}

/// Simulated terminal quoting the configured symbol with gold-like contract
/// specs and a slow oscillating price. History starts flat so the first
/// crossover shows up once the price starts to move.
fn paper_terminal(config: &AppConfig) -> SimulatedTerminal {
    let symbol = config.strategy.symbol.as_str();
    let base = Decimal::new(1950, 0);
    let history = vec![base; config.strategy.long_window];
    SimulatedTerminal::new(SimulatedTerminalConfig::default())
        .with_symbol(SymbolInfo {
            name: symbol.to_string(),
            visible: true,
            digits: 2,
            point: Decimal::new(1, 2),
            volume_min: Decimal::new(1, 2),
            volume_max: Decimal::new(100, 0),
            volume_step: Decimal::new(1, 2),
            trade_tick_size: Decimal::new(1, 2),
            trade_tick_value: Decimal::ONE,
        })
        .with_closes(symbol, config.strategy.timeframe, &history)
        .with_price_path(
            symbol,
            config.strategy.timeframe,
            base,
            Decimal::new(50, 2),
            40,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "smabot",
            "--symbol",
            "GBPUSD",
            "--volume",
            "0.05",
            "--risk-percent",
            "2.5",
            "--stop-loss",
            "balance-offset",
            "--port",
            "7000",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.strategy.symbol, "GBPUSD");
        assert_eq!(config.orders.volume, dec!(0.05));
        assert_eq!(config.orders.risk_percent, dec!(2.5));
        assert_eq!(config.orders.stop_loss_policy, StopLossPolicy::BalanceOffset);
        assert_eq!(config.terminal.port, 7000);
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::parse_from(["smabot"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.strategy.symbol, "XAUUSD");
        assert_eq!(config.orders.volume, dec!(0.01));
        assert_eq!(config.orders.risk_percent, dec!(1));
        assert!(!cli.paper);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_json_log_format() {
        let cli = Cli::parse_from(["smabot", "--log-format", "json"]);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[tokio::test]
    async fn test_paper_run_shuts_down() {
        let mut config = AppConfig::default();
        config.schedule.interval_secs = 0;
        config.schedule.retry_secs = 0;
        let trader = LiveTrader::new(
            config.live(Some(3)),
            SmaCrossover::new(config.windows()).unwrap(),
            OrderPlacer::new(config.orders.clone()),
        );
        let mut terminal = paper_terminal(&config);

        let reason = trader
            .run(&mut terminal, std::future::pending())
            .await
            .unwrap();
        assert_eq!(reason, StopReason::IterationLimit);
        assert_eq!(terminal.shutdown_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_before_start_still_shuts_down() {
        let config = AppConfig::default();
        let trader = LiveTrader::new(
            config.live(None),
            SmaCrossover::new(config.windows()).unwrap(),
            OrderPlacer::new(config.orders.clone()),
        );
        let mut terminal = paper_terminal(&config);
        let stop = StopSignal::new();
        stop.trigger();

        let reason = run(&trader, &mut terminal, &stop).await.unwrap();
        assert_eq!(reason, StopReason::Interrupted);
        assert!(terminal.sent_orders().is_empty());
        assert_eq!(terminal.shutdown_count(), 1);
    }
}
