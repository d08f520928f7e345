use thiserror::Error;

use crate::handle::ValueId;
use crate::native::NativeError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Engine initialization failed: {0}")]
    Init(String),

    #[error("Failed to query engine value {value:?}: {source}")]
    Query {
        value: ValueId,
        #[source]
        source: NativeError,
    },

    #[error("Engine operation failed: {0}")]
    Operation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// The caller used the API wrongly; retrying the same call cannot succeed.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidArgument(_)
                | EngineError::IllegalState(_)
                | EngineError::InvalidKey(_)
                | EngineError::Configuration(_)
        )
    }

    /// The native engine or its environment failed.
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self,
            EngineError::Init(_) | EngineError::Query { .. } | EngineError::Operation(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_and_engine_failures_are_disjoint() {
        let errors = [
            EngineError::InvalidArgument("offset".into()),
            EngineError::IllegalState("not initialized".into()),
            EngineError::InvalidKey("no handle".into()),
            EngineError::Configuration("bad flag".into()),
            EngineError::Init("self test".into()),
            EngineError::Query {
                value: ValueId::Version,
                source: NativeError::new("unavailable"),
            },
            EngineError::Operation("sign".into()),
        ];

        for error in &errors {
            assert_ne!(error.is_usage_error(), error.is_engine_failure(), "{error}");
        }
    }

    #[test]
    fn test_query_error_keeps_native_source() {
        let error = EngineError::Query {
            value: ValueId::InstallPath,
            source: NativeError::new("no install path"),
        };
        let source = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("no install path"));
    }
}
