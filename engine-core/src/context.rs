//! Engine context lifecycle
//!
//! An [`EngineContext`] owns the handle returned by native initialization and
//! caches the metadata the engine reports about itself. One context is
//! normally created per process (or per FIPS / non-FIPS mode) and shared by
//! every [`SignatureEngine`](crate::SignatureEngine) through an `Arc`.
//!
//! # FIPS initialization
//!
//! A FIPS-mode engine occasionally fails its entropy self check while loading.
//! Those failures are retried up to [`ContextConfig::max_fips_attempts`]
//! times. A final failure reporting "context is not in FIPS mode" is a real
//! configuration problem and is returned as [`EngineError::Init`].

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ContextConfig, RetryExhaustion};
use crate::error::{EngineError, EngineResult};
use crate::handle::{ContextHandle, ValueId};
use crate::lazy::LazyValue;
use crate::native::{NativeEngine, NativeError};

/// Shared by every context in the process.
static LIBRARY_BUILD_DATE: LazyValue = LazyValue::new();

/// Build date of the loaded native library.
///
/// The engine is asked once per process; later calls, from any context or
/// thread, return the cached value.
pub fn library_build_date(engine: &dyn NativeEngine) -> &'static str {
    match LIBRARY_BUILD_DATE.get_or_try_fetch(|| {
        debug!("fetching native library build date");
        Ok::<_, Infallible>(engine.library_build_date())
    }) {
        Ok(date) => date,
        Err(never) => match never {},
    }
}

pub struct EngineContext {
    engine: Arc<dyn NativeEngine>,
    handle: ContextHandle,
    fips: bool,
    version: LazyValue,
    install_path: LazyValue,
}

impl EngineContext {
    /// Create a context configured from the build defaults and the `ENGINE_*`
    /// environment variables (see [`ContextConfig::from_env`]).
    ///
    /// A malformed variable fails with [`EngineError::Configuration`] before
    /// any native call.
    pub fn create(engine: Arc<dyn NativeEngine>, fips: bool) -> EngineResult<Self> {
        let config = ContextConfig::from_env()?;
        Self::create_with_config(engine, fips, &config)
    }

    pub fn create_with_config(
        engine: Arc<dyn NativeEngine>,
        fips: bool,
        config: &ContextConfig,
    ) -> EngineResult<Self> {
        config.validate()?;

        let handle = initialize_with_retry(engine.as_ref(), fips, config)?;

        if config.validate_location {
            engine.validate_library_location(handle).map_err(|e| {
                EngineError::Init(format!("library location validation failed: {}", e))
            })?;
        }

        if config.validate_version {
            engine.validate_library_version(handle).map_err(|e| {
                EngineError::Init(format!("library version validation failed: {}", e))
            })?;
        }

        info!(fips, handle = %handle, "engine context created");

        Ok(Self {
            engine,
            handle,
            fips,
            version: LazyValue::new(),
            install_path: LazyValue::new(),
        })
    }

    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    pub fn is_fips(&self) -> bool {
        self.fips
    }

    pub fn engine(&self) -> &dyn NativeEngine {
        self.engine.as_ref()
    }

    /// Version string of the loaded engine, fetched on first use.
    pub fn version(&self) -> EngineResult<&str> {
        self.cached_value(&self.version, ValueId::Version)
    }

    /// Install path of the loaded engine, fetched on first use.
    pub fn install_path(&self) -> EngineResult<&str> {
        self.cached_value(&self.install_path, ValueId::InstallPath)
    }

    pub fn library_build_date(&self) -> &'static str {
        library_build_date(self.engine.as_ref())
    }

    /// Whether the engine currently reports FIPS approved mode. Not cached.
    pub fn fips_approved_mode(&self) -> EngineResult<bool> {
        let raw = self
            .engine
            .scalar_value(self.handle, ValueId::FipsApprovedMode)
            .map_err(|source| EngineError::Query {
                value: ValueId::FipsApprovedMode,
                source,
            })?;

        match raw.trim().to_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" | "" => Ok(false),
            other => Err(EngineError::Query {
                value: ValueId::FipsApprovedMode,
                source: NativeError::new(format!(
                    "unexpected FIPS approved mode value {:?}",
                    other
                )),
            }),
        }
    }

    fn cached_value<'a>(&'a self, slot: &'a LazyValue, value: ValueId) -> EngineResult<&'a str> {
        slot.get_or_try_fetch(|| {
            debug!(
                ?value,
                code = value.code(),
                handle = %self.handle,
                "fetching engine value"
            );
            self.engine
                .scalar_value(self.handle, value)
                .map_err(|source| EngineError::Query { value, source })
        })
    }
}

fn initialize_with_retry(
    engine: &dyn NativeEngine,
    fips: bool,
    config: &ContextConfig,
) -> EngineResult<ContextHandle> {
    let max_attempts = if fips { config.max_fips_attempts } else { 1 };
    let mut last_failure: Option<NativeError> = None;

    for attempt in 1..=max_attempts {
        match engine.initialize(fips) {
            Ok(handle) => {
                debug!(attempt, fips, "native engine initialized");
                return Ok(handle);
            }
            Err(e) => {
                if attempt == max_attempts && fips && e.is_not_in_fips_mode() {
                    return Err(EngineError::Init(e.to_string()));
                }
                warn!(
                    attempt,
                    max_attempts,
                    fips,
                    error = %e,
                    "native engine initialization failed"
                );
                last_failure = Some(e);
            }
        }
    }

    match config.on_exhausted_retries {
        RetryExhaustion::Fail => Err(EngineError::Init(match last_failure {
            Some(e) => format!("gave up after {} attempt(s): {}", max_attempts, e),
            None => format!("gave up after {} attempt(s)", max_attempts),
        })),
        RetryExhaustion::InvalidHandle => {
            warn!(
                max_attempts,
                fips, "engine initialization exhausted; continuing with an invalid context handle"
            );
            Ok(ContextHandle::INVALID)
        }
    }
}

impl fmt::Display for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineContext [isFIPS={}, id={}]", self.fips, self.handle)
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("handle", &self.handle)
            .field("fips", &self.fips)
            .field("version", &self.version.get())
            .field("install_path", &self.install_path.get())
            .finish_non_exhaustive()
    }
}
