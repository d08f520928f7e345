use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::context::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::handle::DigestHandle;

/// A native message digest accumulator bound to one algorithm.
///
/// The native state is released when the digest is dropped.
pub struct Digest {
    context: Arc<EngineContext>,
    handle: DigestHandle,
    algorithm: String,
}

impl Digest {
    pub fn new(context: Arc<EngineContext>, algorithm: &str) -> EngineResult<Self> {
        let handle = context
            .engine()
            .digest_create(context.handle(), algorithm)
            .map_err(|e| {
                EngineError::Init(format!("failed to create {} digest: {}", algorithm, e))
            })?;

        if !handle.is_valid() {
            return Err(EngineError::Init(format!(
                "engine returned an invalid handle for {} digest",
                algorithm
            )));
        }

        Ok(Self {
            context,
            handle,
            algorithm: algorithm.to_string(),
        })
    }

    pub fn update(&mut self, data: &[u8]) -> EngineResult<()> {
        self.context
            .engine()
            .digest_update(self.context.handle(), self.handle, data)
            .map_err(|e| {
                EngineError::Operation(format!("{} digest update failed: {}", self.algorithm, e))
            })
    }

    /// Discard everything accumulated so far.
    pub fn reset(&mut self) -> EngineResult<()> {
        self.context
            .engine()
            .digest_reset(self.context.handle(), self.handle)
            .map_err(|e| {
                EngineError::Operation(format!("{} digest reset failed: {}", self.algorithm, e))
            })
    }

    pub fn native_id(&self) -> DigestHandle {
        self.handle
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }
}

impl Drop for Digest {
    fn drop(&mut self) {
        if let Err(e) = self
            .context
            .engine()
            .digest_free(self.context.handle(), self.handle)
        {
            warn!(
                algorithm = %self.algorithm,
                handle = %self.handle,
                error = %e,
                "failed to free native digest"
            );
        }
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Digest")
            .field("handle", &self.handle)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
