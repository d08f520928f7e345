//! Logging setup for the native engine binding
//!
//! Library crates in the workspace only emit `tracing` events. Binaries and
//! test harnesses call [`init_logging`] once to install a subscriber.
//!
//! # Example
//!
//! ```no_run
//! use telemetry::{init_logging, LogConfig, LogFormat, LogLevel};
//!
//! init_logging(&LogConfig {
//!     level: LogLevel::Debug,
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! })?;
//! tracing::info!("engine ready");
//! # Ok::<(), telemetry::TelemetryError>(())
//! ```

pub mod error;
pub mod logging;

pub use error::{Result, TelemetryError};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
