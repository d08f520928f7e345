//! One-shot sign / verify against the native engine
//!
//! A [`SignatureEngine`] binds one digest accumulator and one key to an
//! [`EngineContext`]:
//!
//! ```text
//! new ─▶ Uninitialized ──initialize──▶ Initialized ──sign / verify──▶ done
//!                              ▲                                     │
//!                              └──────────── initialize ◀────────────┘
//! ```
//!
//! `update` may be called in any state. Once the native sign or verify call
//! has been made the digest is reset before control returns, whether the call
//! succeeded, failed, or panicked, so a reused instance always starts from an
//! empty digest.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::context::EngineContext;
use crate::digest::Digest;
use crate::error::{EngineError, EngineResult};
use crate::handle::KeyHandle;
use crate::key::AsymmetricKey;
use crate::native::NativeError;

const BAD_ID_MESSAGE: &str = "Digest Identifier or PKey Identifier is not valid";

pub struct SignatureEngine {
    context: Arc<EngineContext>,
    state: Mutex<SignatureState>,
}

struct SignatureState {
    digest: Digest,
    key: Option<Arc<dyn AsymmetricKey>>,
    convert_key_for_plain_rsa: bool,
}

impl SignatureState {
    fn bound_key(&self) -> EngineResult<Arc<dyn AsymmetricKey>> {
        self.key
            .clone()
            .ok_or_else(|| EngineError::IllegalState("Signature not initialized".to_string()))
    }

    /// Snapshot the key handle once so the handle checked is the one used.
    fn checked_key_handle(&self, key: &dyn AsymmetricKey) -> EngineResult<KeyHandle> {
        let key_handle = key.native_id();
        if !self.digest.native_id().is_valid() || !key_handle.is_valid() {
            return Err(EngineError::Operation(BAD_ID_MESSAGE.to_string()));
        }
        Ok(key_handle)
    }
}

impl SignatureEngine {
    /// Create an engine whose digest uses `digest_algorithm`.
    pub fn new(context: Arc<EngineContext>, digest_algorithm: &str) -> EngineResult<Self> {
        let digest = Digest::new(Arc::clone(&context), digest_algorithm)?;

        Ok(Self {
            context,
            state: Mutex::new(SignatureState {
                digest,
                key: None,
                convert_key_for_plain_rsa: false,
            }),
        })
    }

    /// Feed `input[offset..offset + length]` into the digest.
    pub fn update(&self, input: &[u8], offset: usize, length: usize) -> EngineResult<()> {
        let bytes = offset
            .checked_add(length)
            .and_then(|end| input.get(offset..end))
            .ok_or_else(|| {
                EngineError::InvalidArgument(format!(
                    "Bad input parameters to Signature update: offset {}, length {}, buffer length {}",
                    offset,
                    length,
                    input.len()
                ))
            })?;

        self.state.lock().digest.update(bytes)
    }

    pub fn update_all(&self, input: &[u8]) -> EngineResult<()> {
        self.update(input, 0, input.len())
    }

    /// Bind `key` and start a fresh message.
    ///
    /// Anything accumulated before this call is discarded, and any previously
    /// bound key is released, even when `key` is rejected.
    pub fn initialize(
        &self,
        key: Arc<dyn AsymmetricKey>,
        convert_key_for_plain_rsa: bool,
    ) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.key = None;
        state.convert_key_for_plain_rsa = false;
        state.digest.reset()?;

        if !key.native_id().is_valid() {
            return Err(EngineError::InvalidKey(format!(
                "{} key has no native identifier",
                key.algorithm()
            )));
        }

        debug!(
            algorithm = key.algorithm(),
            digest = state.digest.algorithm(),
            convert_key_for_plain_rsa,
            "signature initialized"
        );
        state.key = Some(key);
        state.convert_key_for_plain_rsa = convert_key_for_plain_rsa;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().key.is_some()
    }

    /// Sign everything fed through `update` since the last reset.
    pub fn sign(&self) -> EngineResult<Vec<u8>> {
        let mut state = self.state.lock();
        let key = state.bound_key()?;
        let key_handle = state.checked_key_handle(key.as_ref())?;
        let convert = state.convert_key_for_plain_rsa;

        let scope = ResetScope::new(&mut state.digest);
        let outcome = self.context.engine().signature_sign(
            self.context.handle(),
            scope.digest().native_id(),
            key_handle,
            convert,
        );
        let reset = scope.finish();

        settle("sign", outcome, reset)
    }

    /// Check `signature` against everything fed through `update`.
    ///
    /// A signature that does not match, including a malformed one, is
    /// `Ok(false)`.
    pub fn verify(&self, signature: &[u8]) -> EngineResult<bool> {
        let mut state = self.state.lock();
        let key = state.bound_key()?;
        let key_handle = state.checked_key_handle(key.as_ref())?;

        let scope = ResetScope::new(&mut state.digest);
        let outcome = self.context.engine().signature_verify(
            self.context.handle(),
            scope.digest().native_id(),
            key_handle,
            signature,
        );
        let reset = scope.finish();

        settle("verify", outcome, reset)
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.context
    }

    pub fn digest_algorithm(&self) -> String {
        self.state.lock().digest.algorithm().to_string()
    }
}

impl fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SignatureEngine")
            .field("context", &self.context)
            .field("digest", &state.digest)
            .field("initialized", &state.key.is_some())
            .field("convert_key_for_plain_rsa", &state.convert_key_for_plain_rsa)
            .finish()
    }
}

/// Resets the digest when the scope ends.
///
/// `finish` resets and reports the result. If the scope is left any other
/// way (a panic inside the native call) the reset happens on drop.
struct ResetScope<'a> {
    digest: &'a mut Digest,
    armed: bool,
}

impl<'a> ResetScope<'a> {
    fn new(digest: &'a mut Digest) -> Self {
        Self {
            digest,
            armed: true,
        }
    }

    fn digest(&self) -> &Digest {
        &*self.digest
    }

    fn finish(mut self) -> EngineResult<()> {
        self.armed = false;
        self.digest.reset()
    }
}

impl Drop for ResetScope<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.digest.reset() {
                warn!(error = %e, "digest reset failed while unwinding");
            }
        }
    }
}

/// The native failure wins over a reset failure.
fn settle<T>(
    operation: &str,
    outcome: Result<T, NativeError>,
    reset: EngineResult<()>,
) -> EngineResult<T> {
    match (outcome, reset) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(reset_error)) => Err(reset_error),
        (Err(native), reset) => {
            if let Err(reset_error) = reset {
                warn!(operation, error = %reset_error, "digest reset failed after native failure");
            }
            Err(EngineError::Operation(format!("{} failed: {}", operation, native)))
        }
    }
}
