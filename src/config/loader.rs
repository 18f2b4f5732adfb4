//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching the
//! config.toml structure at the repository root. Every recognized option
//! is an explicit struct field; unknown keys fail the parse rather than
//! being silently ignored.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub scanner: ScannerSection,
    pub monitor: MonitorSection,
    pub pacing: PacingSection,
    pub store: StoreSection,
    pub logging: LoggingSection,
}

/// Pair discovery settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerSection {
    /// Minimum 24h volume (quote units) for the universe
    pub min_volume_24h: f64,
    /// Minimum open interest (quote units) for the universe
    pub min_open_interest: f64,
    /// Correlation floor for same-sector candidates
    pub same_sector_min_correlation: f64,
    /// Higher correlation bar for cross-sector candidates
    pub cross_sector_min_correlation: f64,
    /// Most-liquid instruments per sector eligible for cross-sector pairs
    pub cross_sector_top_k: usize,
    /// Discard candidates with a half-life beyond this (days)
    pub max_half_life_days: f64,
    /// Watchlist slots per sector
    pub top_per_sector: usize,
    /// Watchlist slots for cross-sector pairs
    pub top_cross_sector: usize,
    /// Daily observations fetched per instrument
    pub history_days: usize,
    /// Hourly observations used for divergence profiling
    pub profile_hours: usize,
}

/// Trade lifecycle settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Maximum concurrent positions
    pub max_positions: usize,
    /// Fallback entry threshold when profiling finds nothing better
    pub default_entry_threshold: f64,
    /// Correlation floor for entries
    pub min_entry_correlation: f64,
    /// Correlation breakdown exit level
    pub exit_correlation: f64,
    /// Entry requires a half-life at or under this (days)
    pub max_entry_half_life_days: f64,
    /// Short-window confirmation size (observations)
    pub confirmation_window: usize,
    /// Confirmation z must reach this fraction of the entry threshold
    pub confirmation_fraction: f64,
    /// Partial exit profit trigger (fraction)
    pub partial_exit_pnl: f64,
    /// Final exit profit trigger after a partial (fraction)
    pub final_exit_pnl: f64,
    /// Absolute stop-loss floor (z magnitude)
    pub stop_loss_floor: f64,
    /// Stop at this multiple of the entry z
    pub stop_entry_multiple: f64,
    /// Stop at this multiple of the worst historical divergence
    pub stop_historical_multiple: f64,
    /// Time stop after this many entry half-lives
    pub time_stop_half_lives: f64,
    /// Notional per position in quote units
    pub position_notional: f64,
    /// Rolling window for the reactive z-score (observations)
    pub z_window: usize,
    /// Structural window for cointegration and dual beta (observations)
    pub structural_window: usize,
}

/// Upstream pacing and loop intervals
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacingSection {
    /// Minimum gap between upstream calls (milliseconds)
    pub inter_call_delay_ms: u64,
    /// Discovery scan interval (seconds)
    pub scan_interval_secs: u64,
    /// Monitor cycle interval (seconds)
    pub monitor_interval_secs: u64,
}

/// Persistence settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Directory for the JSON collections (supports ~)
    pub data_dir: String,
}

impl StoreSection {
    /// Data directory with tilde expansion.
    pub fn expanded_data_dir(&self) -> String {
        shellexpand::tilde(&self.data_dir).to_string()
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scanner;
        if s.same_sector_min_correlation <= 0.0 || s.same_sector_min_correlation >= 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "same_sector_min_correlation must be in (0, 1), got {}",
                s.same_sector_min_correlation
            )));
        }
        if s.cross_sector_min_correlation < s.same_sector_min_correlation {
            return Err(ConfigError::ValidationError(
                "cross_sector_min_correlation must be at least the same-sector bar".to_string(),
            ));
        }
        if s.max_half_life_days <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "max_half_life_days must be > 0, got {}",
                s.max_half_life_days
            )));
        }
        if s.top_per_sector == 0 {
            return Err(ConfigError::ValidationError(
                "top_per_sector must be > 0".to_string(),
            ));
        }
        if s.history_days < 40 {
            return Err(ConfigError::ValidationError(format!(
                "history_days must be at least 40 for Hurst estimation, got {}",
                s.history_days
            )));
        }

        let m = &self.monitor;
        if m.max_positions == 0 {
            return Err(ConfigError::ValidationError(
                "max_positions must be > 0".to_string(),
            ));
        }
        if m.default_entry_threshold <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "default_entry_threshold must be > 0, got {}",
                m.default_entry_threshold
            )));
        }
        if !(0.0..1.0).contains(&m.exit_correlation)
            || !(0.0..1.0).contains(&m.min_entry_correlation)
            || m.exit_correlation >= m.min_entry_correlation
        {
            return Err(ConfigError::ValidationError(format!(
                "correlation bounds must satisfy 0 <= exit ({}) < entry ({}) < 1",
                m.exit_correlation, m.min_entry_correlation
            )));
        }
        if !(0.0..=1.0).contains(&m.confirmation_fraction) {
            return Err(ConfigError::ValidationError(format!(
                "confirmation_fraction must be in [0, 1], got {}",
                m.confirmation_fraction
            )));
        }
        if m.partial_exit_pnl <= 0.0 || m.final_exit_pnl <= m.partial_exit_pnl {
            return Err(ConfigError::ValidationError(format!(
                "exit PnL triggers must satisfy 0 < partial ({}) < final ({})",
                m.partial_exit_pnl, m.final_exit_pnl
            )));
        }
        if m.position_notional <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "position_notional must be > 0, got {}",
                m.position_notional
            )));
        }
        if m.z_window < 2 || m.structural_window < m.z_window {
            return Err(ConfigError::ValidationError(format!(
                "windows must satisfy 2 <= z_window ({}) <= structural_window ({})",
                m.z_window, m.structural_window
            )));
        }

        if self.pacing.monitor_interval_secs == 0 || self.pacing.scan_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "loop intervals must be > 0".to_string(),
            ));
        }
        if self.store.data_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "data_dir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[scanner]
min_volume_24h = 5000000.0
min_open_interest = 1000000.0
same_sector_min_correlation = 0.7
cross_sector_min_correlation = 0.85
cross_sector_top_k = 3
max_half_life_days = 30.0
top_per_sector = 3
top_cross_sector = 2
history_days = 90
profile_hours = 360

[monitor]
max_positions = 5
default_entry_threshold = 2.0
min_entry_correlation = 0.6
exit_correlation = 0.4
max_entry_half_life_days = 30.0
confirmation_window = 7
confirmation_fraction = 0.8
partial_exit_pnl = 0.03
final_exit_pnl = 0.05
stop_loss_floor = 3.0
stop_entry_multiple = 1.5
stop_historical_multiple = 1.2
time_stop_half_lives = 2.0
position_notional = 1000.0
z_window = 30
structural_window = 90

[pacing]
inter_call_delay_ms = 250
scan_interval_secs = 21600
monitor_interval_secs = 900

[store]
data_dir = "data"

[logging]
level = "info"
"#
        .to_string()
    }

    fn load_from_str(content: &str) -> Result<Config, ConfigError> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load_config(file.path())
    }

    #[test]
    fn test_load_valid_config() {
        let config = load_from_str(&create_valid_config()).unwrap();
        assert_eq!(config.scanner.top_per_sector, 3);
        assert_eq!(config.monitor.max_positions, 5);
        assert_eq!(config.monitor.z_window, 30);
        assert_eq!(config.pacing.inter_call_delay_ms, 250);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_unknown_key_fails_parse() {
        let content = create_valid_config().replace("level = \"info\"", "level = \"info\"\ntypo_key = 1");
        assert!(matches!(
            load_from_str(&content).unwrap_err(),
            ConfigError::ParseError(_)
        ));
    }

    #[test]
    fn test_cross_sector_bar_must_exceed_same_sector() {
        let content = create_valid_config().replace(
            "cross_sector_min_correlation = 0.85",
            "cross_sector_min_correlation = 0.5",
        );
        assert!(matches!(
            load_from_str(&content).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_exit_correlation_must_be_below_entry() {
        let content = create_valid_config().replace("exit_correlation = 0.4", "exit_correlation = 0.7");
        assert!(matches!(
            load_from_str(&content).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_partial_must_be_below_final() {
        let content = create_valid_config().replace("final_exit_pnl = 0.05", "final_exit_pnl = 0.02");
        assert!(matches!(
            load_from_str(&content).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let content = create_valid_config().replace("max_positions = 5", "max_positions = 0");
        assert!(matches!(
            load_from_str(&content).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_data_dir_expansion() {
        let section = StoreSection {
            data_dir: "~/pairflow-data".to_string(),
        };
        assert!(!section.expanded_data_dir().starts_with('~'));
    }
}
