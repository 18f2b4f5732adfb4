//! pairflow - Statistical-Arbitrage Pairs Engine
//!
//! Discovers cointegrated perpetual pairs and manages the trade lifecycle.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use pairflow::adapters::cli::{CliApp, Command};
use pairflow::adapters::{JsonStore, LogNotifier, ReplayMarketData};
use pairflow::application::{CommandHandler, Orchestrator, Pacer};
use pairflow::config::{load_config, Config};
use pairflow::monitor::{Monitor, MonitorConfig};
use pairflow::scanner::{Scanner, ScannerConfig};

type EngineMonitor = Monitor<ReplayMarketData, JsonStore, LogNotifier>;
type EngineScanner = Scanner<ReplayMarketData, JsonStore>;

#[tokio::main]
async fn main() -> Result<()> {
    // .env holds secrets and local overrides, never config.toml
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config_path = match &app.command {
        Command::Run(cmd) => cmd.config.clone(),
        Command::Scan(cmd) => cmd.config.clone(),
        Command::Monitor(cmd) => cmd.config.clone(),
        Command::Status(cmd) => cmd.config.clone(),
        Command::Enter(cmd) => cmd.config.clone(),
        Command::Exit(cmd) => cmd.config.clone(),
        Command::Blacklist(cmd) => cmd.config.clone(),
    };
    let config = load_config(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Run(cmd) => run_command(&config, &cmd.replay).await,
        Command::Scan(cmd) => scan_command(&config, &cmd.replay).await,
        Command::Monitor(cmd) => monitor_command(&config, &cmd.replay).await,
        Command::Status(_) => status_command(&config).await,
        Command::Enter(cmd) => {
            let handler = command_handler(&config, &cmd.replay)?;
            report(handler.force_enter(&cmd.pair, &cmd.direction, cmd.size).await)
        }
        Command::Exit(cmd) => {
            let handler = command_handler(&config, &cmd.replay)?;
            report(handler.force_exit(&cmd.pair).await)
        }
        Command::Blacklist(cmd) => {
            // store-only command: no market snapshot required
            let store = open_store(&config)?;
            let monitor = build_monitor(&config, Arc::new(ReplayMarketData::empty()), Arc::clone(&store));
            let handler = CommandHandler::new(Arc::new(monitor), store);
            report(handler.blacklist(&cmd.symbol, &cmd.reason).await)
        }
    }
}

fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_new(config_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt().with_env_filter(filter).init();
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<JsonStore>> {
    let dir = config.store.expanded_data_dir();
    let store = JsonStore::new(&dir).with_context(|| format!("failed to open data dir {dir}"))?;
    Ok(Arc::new(store))
}

fn open_market(replay: &Path) -> Result<Arc<ReplayMarketData>> {
    let market = ReplayMarketData::from_file(replay)
        .with_context(|| format!("failed to load market snapshot {}", replay.display()))?;
    Ok(Arc::new(market))
}

fn build_monitor(
    config: &Config,
    market: Arc<ReplayMarketData>,
    store: Arc<JsonStore>,
) -> EngineMonitor {
    let pacer = Arc::new(Pacer::from_millis(config.pacing.inter_call_delay_ms));
    Monitor::new(
        market,
        store,
        Arc::new(LogNotifier::new()),
        MonitorConfig::from(config),
        pacer,
    )
}

fn build_scanner(
    config: &Config,
    market: Arc<ReplayMarketData>,
    store: Arc<JsonStore>,
) -> EngineScanner {
    let pacer = Arc::new(Pacer::from_millis(config.pacing.inter_call_delay_ms));
    Scanner::new(
        market,
        store,
        ScannerConfig::from(config),
        MonitorConfig::from(config).fitness,
        pacer,
    )
}

fn command_handler(
    config: &Config,
    replay: &Path,
) -> Result<CommandHandler<ReplayMarketData, JsonStore, LogNotifier>> {
    let market = open_market(replay)?;
    let store = open_store(config)?;
    let monitor = build_monitor(config, market, Arc::clone(&store));
    Ok(CommandHandler::new(Arc::new(monitor), store))
}

fn report(result: std::result::Result<String, pairflow::application::CommandError>) -> Result<()> {
    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(e) => {
            // short rejection reason, no stack trace
            println!("rejected: {e}");
            Ok(())
        }
    }
}

async fn run_command(config: &Config, replay: &Path) -> Result<()> {
    tracing::info!("starting pairflow...");
    let market = open_market(replay)?;
    let store = open_store(config)?;

    let orchestrator = Orchestrator::new(
        build_scanner(config, Arc::clone(&market), Arc::clone(&store)),
        build_monitor(config, market, store),
        Duration::from_secs(config.pacing.scan_interval_secs),
        Duration::from_secs(config.pacing.monitor_interval_secs),
    );

    let orch = orchestrator.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
        orch.stop().await;
    });

    orchestrator.run().await?;
    tracing::info!("pairflow stopped");
    Ok(())
}

async fn scan_command(config: &Config, replay: &Path) -> Result<()> {
    let market = open_market(replay)?;
    let store = open_store(config)?;
    let scanner = build_scanner(config, market, store);

    let scan = scanner.run_scan().await.context("scan failed")?;
    println!(
        "universe={} candidates={} evaluated={} selected={} pruned={}",
        scan.universe, scan.candidates, scan.evaluated, scan.selected, scan.pruned
    );
    println!(
        "rejections: correlation={} cointegration={} half_life={} hurst={}",
        scan.rejected_correlation,
        scan.rejected_cointegration,
        scan.rejected_half_life,
        scan.rejected_hurst
    );
    Ok(())
}

async fn monitor_command(config: &Config, replay: &Path) -> Result<()> {
    let market = open_market(replay)?;
    let store = open_store(config)?;
    let monitor = build_monitor(config, market, store);

    let cycle = monitor.run_cycle().await.context("monitor cycle failed")?;
    println!(
        "positions={} partial_exits={} final_exits={} entries={} skipped={} rescan={}",
        cycle.positions_checked,
        cycle.partial_exits,
        cycle.final_exits,
        cycle.entries,
        cycle.skipped,
        cycle.rescan_requested
    );
    Ok(())
}

async fn status_command(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    use pairflow::ports::PersistencePort;

    let positions = store.list_positions().await.context("failed to read positions")?;
    println!("open positions: {}", positions.len());
    for p in &positions {
        println!(
            "  {} {} z={:.2} pnl={:+.2}% health={} ({})",
            p.direction,
            p.pair,
            p.current_z,
            p.current_pnl * 100.0,
            p.health.band,
            if p.partial_exit_taken { "half out" } else { "full" },
        );
    }

    let watchlist = store.list_watchlist().await.context("failed to read watchlist")?;
    println!("watchlist: {}", watchlist.len());
    for e in &watchlist {
        println!(
            "  {} [{}] z={:.2} threshold={:.2} conviction={:.0}{}{}",
            e.pair,
            e.sector,
            e.fitness.z_score,
            e.entry_threshold,
            e.fitness.conviction,
            if e.is_ready { " READY" } else { "" },
            if e.reversion_warning { " WARN" } else { "" },
        );
    }
    Ok(())
}
