//! Engine context configuration
//!
//! Defaults come from cargo features so a build can pin which library
//! validations run; environment variables may override them at run time:
//! - `ENGINE_MAX_FIPS_ATTEMPTS`
//! - `ENGINE_VALIDATE_LOCATION`
//! - `ENGINE_VALIDATE_VERSION`
//! - `ENGINE_ON_EXHAUSTED_RETRIES` (`fail` or `invalid-handle`)

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of native initialization attempts made for a FIPS context.
pub const DEFAULT_MAX_FIPS_ATTEMPTS: u32 = 10;

/// What `EngineContext::create` does when every FIPS initialization attempt
/// failed without the engine reporting "context is not in FIPS mode".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryExhaustion {
    /// Return an initialization error carrying the last native failure.
    #[default]
    Fail,
    /// Build the context around the invalid handle and log a warning.
    /// Every later native call against it will fail.
    InvalidHandle,
}

impl FromStr for RetryExhaustion {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" | "error" => Ok(RetryExhaustion::Fail),
            "invalid-handle" | "invalid_handle" | "legacy" => Ok(RetryExhaustion::InvalidHandle),
            _ => Err(EngineError::Configuration(format!(
                "Unknown retry exhaustion policy: {}. Valid options: fail, invalid-handle",
                s
            ))),
        }
    }
}

/// Engine context configuration
///
/// Deserializes from a partial document; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Initialization attempts for a FIPS context (non-FIPS always makes one)
    pub max_fips_attempts: u32,

    /// Validate the library was loaded from the expected install path
    pub validate_location: bool,

    /// Validate the library version against its signature file
    pub validate_version: bool,

    pub on_exhausted_retries: RetryExhaustion,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_fips_attempts: DEFAULT_MAX_FIPS_ATTEMPTS,
            validate_location: cfg!(feature = "validate-location"),
            validate_version: cfg!(feature = "validate-version"),
            on_exhausted_retries: RetryExhaustion::Fail,
        }
    }
}

impl ContextConfig {
    /// Create a configuration from the build defaults and process environment
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create a configuration from the build defaults and a variable lookup
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(attempts) = lookup("ENGINE_MAX_FIPS_ATTEMPTS") {
            config.max_fips_attempts = attempts.trim().parse().map_err(|e| {
                EngineError::Configuration(format!("Invalid ENGINE_MAX_FIPS_ATTEMPTS: {}", e))
            })?;
        }

        if let Some(flag) = lookup("ENGINE_VALIDATE_LOCATION") {
            config.validate_location = parse_flag("ENGINE_VALIDATE_LOCATION", &flag)?;
        }

        if let Some(flag) = lookup("ENGINE_VALIDATE_VERSION") {
            config.validate_version = parse_flag("ENGINE_VALIDATE_VERSION", &flag)?;
        }

        if let Some(policy) = lookup("ENGINE_ON_EXHAUSTED_RETRIES") {
            config.on_exhausted_retries = policy.trim().parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_fips_attempts == 0 {
            return Err(EngineError::Configuration(
                "max_fips_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Disable both library validations
    pub fn without_validation(mut self) -> Self {
        self.validate_location = false;
        self.validate_version = false;
        self
    }
}

fn parse_flag(name: &str, value: &str) -> EngineResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(EngineError::Configuration(format!(
            "Invalid {}: {}. Expected true or false",
            name, other
        ))),
    }
}
