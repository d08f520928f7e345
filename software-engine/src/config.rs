//! Software engine configuration
//!
//! Environment overrides:
//! - `SOFTWARE_ENGINE_INSTALL_PATH`
//! - `SOFTWARE_ENGINE_BUILD_DATE`
//! - `SOFTWARE_ENGINE_FIPS_CAPABLE`
//! - `SOFTWARE_ENGINE_FIPS_SELF_TEST_FAILURES`
//! - `SOFTWARE_ENGINE_EXPECTED_INSTALL_PATH`
//! - `SOFTWARE_ENGINE_EXPECTED_VERSION`

use serde::{Deserialize, Serialize};

use crate::error::{SoftwareEngineError, SoftwareEngineResult};

/// Version reported through the engine's `Version` value
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftwareEngineConfig {
    /// Path reported as the engine install location
    pub install_path: String,

    /// Reported library build date
    pub build_date: String,

    /// Whether FIPS contexts can be created at all
    pub fips_capable: bool,

    /// Number of FIPS initializations that fail their self test before one
    /// succeeds. Simulates the entropy check flake of real FIPS modules.
    pub fips_self_test_failures: u32,

    /// When set, location validation fails unless `install_path` matches
    pub expected_install_path: Option<String>,

    /// When set, version validation fails unless [`ENGINE_VERSION`] matches
    pub expected_version: Option<String>,
}

impl Default for SoftwareEngineConfig {
    fn default() -> Self {
        Self {
            install_path: "builtin".to_string(),
            build_date: option_env!("SOFTWARE_ENGINE_BUILD_DATE")
                .unwrap_or("unknown")
                .to_string(),
            fips_capable: true,
            fips_self_test_failures: 0,
            expected_install_path: None,
            expected_version: None,
        }
    }
}

impl SoftwareEngineConfig {
    pub fn from_env() -> SoftwareEngineResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create a configuration from the defaults and a variable lookup
    pub fn from_lookup<F>(lookup: F) -> SoftwareEngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("SOFTWARE_ENGINE_INSTALL_PATH") {
            config.install_path = path;
        }

        if let Some(date) = lookup("SOFTWARE_ENGINE_BUILD_DATE") {
            config.build_date = date;
        }

        if let Some(flag) = lookup("SOFTWARE_ENGINE_FIPS_CAPABLE") {
            config.fips_capable = parse_flag("SOFTWARE_ENGINE_FIPS_CAPABLE", &flag)?;
        }

        if let Some(count) = lookup("SOFTWARE_ENGINE_FIPS_SELF_TEST_FAILURES") {
            config.fips_self_test_failures = count.trim().parse().map_err(|e| {
                SoftwareEngineError::Configuration(format!(
                    "Invalid SOFTWARE_ENGINE_FIPS_SELF_TEST_FAILURES: {}",
                    e
                ))
            })?;
        }

        config.expected_install_path = lookup("SOFTWARE_ENGINE_EXPECTED_INSTALL_PATH");
        config.expected_version = lookup("SOFTWARE_ENGINE_EXPECTED_VERSION");

        Ok(config)
    }
}

fn parse_flag(name: &str, value: &str) -> SoftwareEngineResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SoftwareEngineError::Configuration(format!(
            "Invalid {}: {}. Expected true or false",
            name, other
        ))),
    }
}
