use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoftwareEngineError {
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type SoftwareEngineResult<T> = Result<T, SoftwareEngineError>;
