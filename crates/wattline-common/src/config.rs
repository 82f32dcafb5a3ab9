//! ---
//! wl_section: "01-core-functionality"
//! wl_subsection: "module"
//! wl_type: "source"
//! wl_scope: "code"
//! wl_description: "Shared primitives and utilities for the WattLine runtime."
//! wl_version: "v0.1.0"
//! wl_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Window spans the operator can select, in minutes.
pub const WINDOW_MINUTE_OPTIONS: [i64; 3] = [5, 15, 30];

fn default_source() -> PathBuf {
    PathBuf::from("data/device.jsonl")
}

fn default_playback_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_window_minutes() -> i64 {
    15
}

fn default_imbalance_threshold() -> f64 {
    15.0
}

fn default_imbalance_min_minutes() -> f64 {
    2.0
}

fn default_max_insights() -> usize {
    6
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the WattLine runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "WATTLINE_CONFIG";

    /// Load configuration from disk, respecting the `WATTLINE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.stream.validate()?;
        self.window.validate()?;
        self.insights.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Sample acquisition settings: where the JSONL stream lives and how fast it
/// is replayed.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_playback_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub playback_interval: Duration,
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(anyhow!("stream source path cannot be empty"));
        }
        if self.playback_interval.is_zero() {
            return Err(anyhow!("stream playback_interval must be positive"));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            playback_interval: default_playback_interval(),
        }
    }
}

/// Sliding window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_minutes")]
    pub minutes: i64,
}

impl WindowConfig {
    /// The window span as a chrono duration for timestamp arithmetic.
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes)
    }

    pub fn validate(&self) -> Result<()> {
        if !WINDOW_MINUTE_OPTIONS.contains(&self.minutes) {
            return Err(anyhow!(
                "window minutes must be one of {:?}, got {}",
                WINDOW_MINUTE_OPTIONS,
                self.minutes
            ));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            minutes: default_window_minutes(),
        }
    }
}

/// Thresholds for the insight detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    #[serde(default = "default_imbalance_threshold")]
    pub imbalance_threshold_percent: f64,
    #[serde(default = "default_imbalance_min_minutes")]
    pub imbalance_min_minutes: f64,
    #[serde(default = "default_max_insights")]
    pub max_insights: usize,
}

impl InsightsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.imbalance_threshold_percent < 0.0 {
            return Err(anyhow!("imbalance_threshold_percent cannot be negative"));
        }
        if self.imbalance_min_minutes < 0.0 {
            return Err(anyhow!("imbalance_min_minutes cannot be negative"));
        }
        if self.max_insights == 0 {
            return Err(anyhow!("max_insights must be at least 1"));
        }
        Ok(())
    }
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            imbalance_threshold_percent: default_imbalance_threshold(),
            imbalance_min_minutes: default_imbalance_min_minutes(),
            max_insights: default_max_insights(),
        }
    }
}

/// Logging sink settings consumed by [`crate::logging::init_tracing`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().expect("defaults must validate");
        assert_eq!(config.window.minutes, 15);
        assert_eq!(config.stream.playback_interval, Duration::from_millis(1000));
        assert_eq!(config.insights.max_insights, 6);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: AppConfig = r#"
            [window]
            minutes = 5

            [stream]
            source = "fixtures/press-line.jsonl"
            playback_interval = 250
        "#
        .parse()
        .expect("partial config parses");
        assert_eq!(config.window.minutes, 5);
        assert_eq!(config.stream.playback_interval, Duration::from_millis(250));
        assert_eq!(config.insights.imbalance_threshold_percent, 15.0);
    }

    #[test]
    fn rejects_unsupported_window_span() {
        let err = "[window]\nminutes = 7"
            .parse::<AppConfig>()
            .expect_err("7 minutes is not a supported span");
        assert!(err.to_string().contains("window minutes"));
    }

    #[test]
    fn rejects_zero_playback_interval() {
        let err = "[stream]\nplayback_interval = 0"
            .parse::<AppConfig>()
            .expect_err("zero cadence is invalid");
        assert!(err.to_string().contains("playback_interval"));
    }

    #[test]
    fn loads_first_existing_candidate() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[window]\nminutes = 30")?;
        file.flush()?;
        let missing = PathBuf::from("does/not/exist.toml");
        let loaded =
            AppConfig::load_with_source(&[missing, file.path().to_path_buf()])?;
        assert_eq!(loaded.config.window.minutes, 30);
        assert_eq!(loaded.source, file.path());
        Ok(())
    }
}
