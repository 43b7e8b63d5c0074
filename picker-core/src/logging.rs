//! src/logging.rs
//! ============================================================================
//! # Structured logging
//!
//! JSON lines go to a rolling, non-blocking file appender; an optional
//! compact layer mirrors the same events to stderr. Both layers share one
//! `EnvFilter` built from `RUST_LOG` plus the configured level directive.

use std::{
    path::{Component, Path, PathBuf},
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tokio::fs as TokioFs;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Directive, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub log_file_prefix: CompactString,
    pub log_level: CompactString,
    pub max_log_files: usize,
    pub rotation: LogRotation,
    /// Mirror events to stderr in a human-readable format
    pub stderr: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    Daily,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: CompactString::const_new("picker"),
            log_level: CompactString::const_new("info"),
            max_log_files: 10,
            rotation: LogRotation::Daily,
            stderr: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Invalid log directory: {0}")]
    InvalidLogDirectory(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Logger builder
pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs the global subscriber. Keep the returned guard alive for as
    /// long as file output is wanted; dropping it flushes the writer.
    pub async fn build(self) -> Result<WorkerGuard> {
        validate_config(&self.config)?;

        if LOGGER_INITIALIZED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoggingError::AlreadyInitialized.into());
        }

        setup_log_directory(&self.config.log_dir).await?;

        let rotation = match self.config.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        };

        let file_appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(self.config.log_file_prefix.as_str())
            .filename_suffix("jsonl")
            .max_log_files(self.config.max_log_files)
            .build(&self.config.log_dir)
            .context("Failed to create file appender")?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(non_blocking)
            .with_filter(make_filter(&self.config.log_level)?);

        let stderr_layer = if self.config.stderr {
            Some(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_filter(make_filter(&self.config.log_level)?),
            )
        } else {
            None
        };

        tracing_subscriber::registry()
            .with(json_layer)
            .with(stderr_layer)
            .try_init()
            .context("Failed to install global tracing subscriber")?;

        Ok(guard)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn make_filter(level: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive(Directive::from_str(level).context("Invalid log level in config")?))
}

fn validate_config(config: &LoggerConfig) -> Result<()> {
    if config.log_level.trim().is_empty() {
        return Err(LoggingError::ConfigError("Log level must not be empty".to_string()).into());
    }

    if config.log_file_prefix.is_empty() {
        return Err(
            LoggingError::ConfigError("Log file prefix must not be empty".to_string()).into(),
        );
    }

    if config.max_log_files == 0 {
        return Err(
            LoggingError::ConfigError("Max log files must be greater than 0".to_string()).into(),
        );
    }

    validate_log_directory(&config.log_dir)?;
    Ok(())
}

fn validate_log_directory(path: &Path) -> Result<()> {
    if path.components().count() == 0 {
        return Err(LoggingError::InvalidLogDirectory("Empty path".to_string()).into());
    }

    if path.components().any(|c| c == Component::ParentDir) {
        return Err(LoggingError::InvalidLogDirectory(
            "Path contains parent directory references".to_string(),
        )
        .into());
    }

    Ok(())
}

async fn setup_log_directory(log_dir: &Path) -> Result<()> {
    if !log_dir.exists() {
        TokioFs::create_dir_all(log_dir)
            .await
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&LoggerConfig::default()).is_ok());
    }

    #[test]
    fn parent_dir_references_are_rejected() {
        let config = LoggerConfig {
            log_dir: PathBuf::from("../escape"),
            ..LoggerConfig::default()
        };
        assert!(validate_config(&config).is_err());

        let empty = LoggerConfig {
            log_dir: PathBuf::new(),
            ..LoggerConfig::default()
        };
        assert!(validate_config(&empty).is_err());
    }

    #[test]
    fn zero_retention_is_rejected() {
        let config = LoggerConfig {
            max_log_files: 0,
            ..LoggerConfig::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("Max log files"));
    }

    #[tokio::test]
    async fn rejected_config_leaves_the_logger_uninstalled() {
        let config = LoggerConfig {
            log_level: CompactString::const_new(" "),
            ..LoggerConfig::default()
        };

        let result = LoggerBuilder::new().with_config(config).build().await;

        assert!(result.is_err());
        assert!(!LOGGER_INITIALIZED.load(Ordering::Acquire));
    }

    #[test]
    fn level_directives_parse() {
        assert!(make_filter("debug").is_ok());
        assert!(make_filter("picker_core=trace").is_ok());
        assert!(make_filter("picker_core=verbose").is_err());
    }

    #[test]
    fn rotation_reads_lowercase() {
        let config: LoggerConfig = toml::from_str("rotation = \"hourly\"\n").unwrap();
        assert!(matches!(config.rotation, LogRotation::Hourly));
    }
}
