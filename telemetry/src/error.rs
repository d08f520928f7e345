use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Logging is already initialized")]
    AlreadyInitialized,

    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
