use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{
    fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::error::{Result, TelemetryError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(TelemetryError::InvalidConfig(format!("unknown log level '{}'", other))),
        }
    }
}

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human readable
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::InvalidConfig(format!("unknown log format '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,

    /// Extra filter directives appended after the level, e.g.
    /// `engine_core=trace`. `RUST_LOG` replaces both when set.
    pub directives: Option<String>,

    pub with_thread_ids: bool,
}

impl LogConfig {
    /// Reads `ENGINE_LOG_LEVEL`, `ENGINE_LOG_FORMAT` and
    /// `ENGINE_LOG_DIRECTIVES`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("ENGINE_LOG_LEVEL") {
            config.level = level.parse()?;
        }
        if let Ok(format) = std::env::var("ENGINE_LOG_FORMAT") {
            config.format = format.parse()?;
        }
        config.directives = std::env::var("ENGINE_LOG_DIRECTIVES").ok();

        Ok(config)
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }

        let directive = match &self.directives {
            Some(extra) if !extra.trim().is_empty() => format!("{},{}", self.level, extra.trim()),
            _ => self.level.to_string(),
        };
        EnvFilter::try_new(&directive).map_err(|e| TelemetryError::InvalidFilter {
            directive,
            reason: e.to_string(),
        })
    }
}

/// Install the global subscriber.
///
/// Only the first successful call in a process takes effect; later calls
/// return [`TelemetryError::AlreadyInitialized`].
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt_layer::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(config.with_thread_ids),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt_layer::layer()
                    .compact()
                    .with_target(true)
                    .with_thread_ids(config.with_thread_ids),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt_layer::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_ids(config.with_thread_ids),
            )
            .try_init(),
    };

    installed.map_err(|_| TelemetryError::AlreadyInitialized)
}
