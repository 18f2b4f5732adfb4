//! CLI argument definitions
//!
//! Command surface for the pairs engine: the periodic loop, one-shot scan
//! and monitor cycles, a status readout, and the manual command interface
//! (force entry, force exit, blacklist).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pairflow - statistical-arbitrage pairs engine for perpetual futures
#[derive(Parser, Debug)]
#[command(
    name = "pairflow",
    version = env!("CARGO_PKG_VERSION"),
    about = "Statistical-arbitrage pairs engine for perpetual futures",
    long_about = "Discovers cointegrated perpetual pairs, scores their trade quality, \
                  and manages a capacity-constrained position pool through a full \
                  entry/exit lifecycle with dynamic stops."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the periodic scan + monitor loop
    Run(RunCmd),

    /// Run a single discovery scan and publish the watchlist
    Scan(ScanCmd),

    /// Run a single monitor cycle over open positions and the watchlist
    Monitor(MonitorCmd),

    /// Show open positions and the current watchlist
    Status(StatusCmd),

    /// Force-enter a pair (same validation and PnL math as the monitor)
    Enter(EnterCmd),

    /// Force-exit an open position
    Exit(ExitCmd),

    /// Blacklist an instrument from future scans
    Blacklist(BlacklistCmd),
}

#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Market data snapshot for replay mode
    #[arg(long, value_name = "FILE")]
    pub replay: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ScanCmd {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    #[arg(long, value_name = "FILE")]
    pub replay: PathBuf,
}

#[derive(Parser, Debug)]
pub struct MonitorCmd {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    #[arg(long, value_name = "FILE")]
    pub replay: PathBuf,
}

#[derive(Parser, Debug)]
pub struct StatusCmd {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,
}

#[derive(Parser, Debug)]
pub struct EnterCmd {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    #[arg(long, value_name = "FILE")]
    pub replay: PathBuf,

    /// Pair as LEG1/LEG2, e.g. ETH/BTC
    pub pair: String,

    /// Direction of the first leg: long or short
    pub direction: String,

    /// Notional size in quote units (defaults to the configured size)
    #[arg(long)]
    pub size: Option<f64>,
}

#[derive(Parser, Debug)]
pub struct ExitCmd {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    #[arg(long, value_name = "FILE")]
    pub replay: PathBuf,

    /// Pair as LEG1/LEG2
    pub pair: String,
}

#[derive(Parser, Debug)]
pub struct BlacklistCmd {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Instrument symbol to exclude from future scans
    pub symbol: String,

    /// Why the instrument is excluded
    pub reason: String,
}
