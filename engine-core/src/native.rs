//! The boundary to the native cryptographic engine.
//!
//! Everything this crate knows about the engine goes through [`NativeEngine`].
//! The production implementation wraps the vendor library; tests use a mock
//! and `software-engine` provides an in-process implementation.

use thiserror::Error;

use crate::handle::{ContextHandle, DigestHandle, KeyHandle, ValueId};

/// Message the engine reports when a FIPS context failed its self checks.
pub const NOT_IN_FIPS_MODE: &str = "Context is not in FIPS mode";

/// A failure reported by the native engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct NativeError {
    message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Case-insensitive match on [`NOT_IN_FIPS_MODE`].
    pub fn is_not_in_fips_mode(&self) -> bool {
        self.message
            .to_uppercase()
            .contains(&NOT_IN_FIPS_MODE.to_uppercase())
    }
}

/// Operations consumed from the native engine.
///
/// Implementations must be callable from many threads at once. Whether two
/// concurrent operations against the same context handle are safe is part of
/// the engine's own contract.
#[cfg_attr(test, mockall::automock)]
pub trait NativeEngine: Send + Sync {
    /// Create a context, in FIPS mode when requested.
    fn initialize(&self, fips: bool) -> Result<ContextHandle, NativeError>;

    /// Verify the loaded library file comes from the expected install path.
    fn validate_library_location(&self, context: ContextHandle) -> Result<(), NativeError>;

    /// Verify the loaded library version matches its signature file.
    fn validate_library_version(&self, context: ContextHandle) -> Result<(), NativeError>;

    fn scalar_value(&self, context: ContextHandle, value: ValueId) -> Result<String, NativeError>;

    /// Build date of the loaded library. Needs no context.
    fn library_build_date(&self) -> String;

    fn digest_create(
        &self,
        context: ContextHandle,
        algorithm: &str,
    ) -> Result<DigestHandle, NativeError>;

    fn digest_update(
        &self,
        context: ContextHandle,
        digest: DigestHandle,
        data: &[u8],
    ) -> Result<(), NativeError>;

    fn digest_reset(&self, context: ContextHandle, digest: DigestHandle)
        -> Result<(), NativeError>;

    fn digest_free(&self, context: ContextHandle, digest: DigestHandle) -> Result<(), NativeError>;

    /// Sign the digest accumulated so far.
    ///
    /// `convert_key_for_plain_rsa` asks the engine to use a plain RSA key
    /// representation; other algorithms ignore it.
    fn signature_sign(
        &self,
        context: ContextHandle,
        digest: DigestHandle,
        key: KeyHandle,
        convert_key_for_plain_rsa: bool,
    ) -> Result<Vec<u8>, NativeError>;

    /// `Ok(false)` for a signature that does not match; `Err` only when the
    /// engine itself failed.
    fn signature_verify(
        &self,
        context: ContextHandle,
        digest: DigestHandle,
        key: KeyHandle,
        signature: &[u8],
    ) -> Result<bool, NativeError>;
}
