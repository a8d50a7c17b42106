//! Application configuration.

use crate::error::{AppError, AppResult};
use optsig_context::{ResolverSettings, DEFAULT_RECENT_WINDOW};
use optsig_core::DEFAULT_WEEKLY_CUTOFF_HOUR;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "OPTSIG_CONFIG";

/// Config file used when neither the CLI nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Context resolution and symbol composition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Records examined by the recency walk. Default: 10.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    /// Max retained history entries (0 = unbounded). Default: 0.
    #[serde(default)]
    pub history_capacity: usize,
    /// Hour on Friday after which "this week" means next Friday. Default: 16.
    #[serde(default = "default_weekly_cutoff_hour")]
    pub weekly_cutoff_hour: u32,
    /// Consult open positions for bare-ticker instructions. Default: true.
    #[serde(default = "default_enable_position_fallback")]
    pub enable_position_fallback: bool,
}

fn default_recent_window() -> usize {
    DEFAULT_RECENT_WINDOW
}

fn default_weekly_cutoff_hour() -> u32 {
    DEFAULT_WEEKLY_CUTOFF_HOUR
}

fn default_enable_position_fallback() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            recent_window: default_recent_window(),
            history_capacity: 0,
            weekly_cutoff_hour: default_weekly_cutoff_hour(),
            enable_position_fallback: default_enable_position_fallback(),
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.recent_window == 0 {
            return Err(AppError::Config(
                "resolver.recent_window must be at least 1".to_string(),
            ));
        }
        if self.weekly_cutoff_hour > 23 {
            return Err(AppError::Config(format!(
                "resolver.weekly_cutoff_hour must be 0-23, got {}",
                self.weekly_cutoff_hour
            )));
        }
        Ok(())
    }

    pub fn settings(&self) -> ResolverSettings {
        ResolverSettings {
            recent_window: self.recent_window,
            enable_position_fallback: self.enable_position_fallback,
        }
    }
}

/// Message source. Stdin when `path` is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Instruction sink. Stdout when `path` is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Open-positions snapshot for the last resolution fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionsConfig {
    /// JSON array of open positions.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Prometheus text dump written at shutdown.
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    optsig_telemetry::DEFAULT_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_path: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub positions: PositionsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration: CLI path > `OPTSIG_CONFIG` > `config/default.toml`.
    ///
    /// An explicitly named file must exist. A missing default file falls back
    /// to built-in defaults.
    pub fn load(cli_path: Option<&Path>) -> AppResult<Self> {
        let explicit = cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match explicit {
            Some(path) => Self::from_file(&path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.resolver.validate()
    }
}
