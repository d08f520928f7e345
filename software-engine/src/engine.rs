use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use engine_core::{
    ContextHandle, DigestHandle, KeyHandle, NativeEngine, NativeError, ValueId, NOT_IN_FIPS_MODE,
};
use p256::ecdsa::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use tracing::debug;

use crate::config::{SoftwareEngineConfig, ENGINE_VERSION};
use crate::digest::DigestState;
use crate::error::{SoftwareEngineError, SoftwareEngineResult};
use crate::keys::{KeyMaterial, KeyRegistry, SoftwareKey, SoftwareKeyPair, EC, RSA};

/// Smallest RSA modulus the engine will generate.
pub const MIN_RSA_BITS: usize = 1024;

/// [`NativeEngine`] implemented in process.
///
/// Handles are drawn from one counter, so a context, a digest and a key
/// never share a value. All state lives in concurrent maps and every method
/// takes `&self`.
pub struct SoftwareEngine {
    config: SoftwareEngineConfig,
    next_handle: AtomicU64,
    remaining_self_test_failures: AtomicU32,
    contexts: DashMap<u64, bool>,
    digests: DashMap<u64, DigestState>,
    keys: Arc<KeyRegistry>,
}

impl SoftwareEngine {
    pub fn new(config: SoftwareEngineConfig) -> Self {
        Self {
            remaining_self_test_failures: AtomicU32::new(config.fips_self_test_failures),
            config,
            next_handle: AtomicU64::new(1),
            contexts: DashMap::new(),
            digests: DashMap::new(),
            keys: Arc::new(DashMap::new()),
        }
    }

    pub fn shared(config: SoftwareEngineConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &SoftwareEngineConfig {
        &self.config
    }

    pub fn generate_rsa_key_pair(&self, bits: usize) -> SoftwareEngineResult<SoftwareKeyPair> {
        if bits < MIN_RSA_BITS {
            return Err(SoftwareEngineError::KeyGenerationFailed(format!(
                "RSA modulus of {} bits is below the {} bit minimum",
                bits, MIN_RSA_BITS
            )));
        }

        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| SoftwareEngineError::KeyGenerationFailed(e.to_string()))?;
        let public = private.to_public_key();

        Ok(SoftwareKeyPair {
            private: self.register_key(KeyMaterial::RsaPrivate(Box::new(private)), RSA, true),
            public: self.register_key(KeyMaterial::RsaPublic(public), RSA, false),
        })
    }

    /// Generate a P-256 key pair.
    pub fn generate_ec_key_pair(&self) -> SoftwareKeyPair {
        let private = SigningKey::random(&mut OsRng);
        let public = VerifyingKey::from(&private);

        SoftwareKeyPair {
            private: self.register_key(KeyMaterial::EcPrivate(private), EC, true),
            public: self.register_key(KeyMaterial::EcPublic(public), EC, false),
        }
    }

    /// Release key material before its last `SoftwareKey` is dropped.
    /// Returns false for an unknown handle.
    pub fn free_key(&self, key: KeyHandle) -> bool {
        self.keys.remove(&key.raw()).is_some()
    }

    pub fn live_digests(&self) -> usize {
        self.digests.len()
    }

    pub fn live_keys(&self) -> usize {
        self.keys.len()
    }

    fn register_key(
        &self,
        material: KeyMaterial,
        algorithm: &'static str,
        private: bool,
    ) -> Arc<SoftwareKey> {
        let handle = self.allocate();
        self.keys.insert(handle, material);
        Arc::new(SoftwareKey::new(
            KeyHandle::new(handle),
            algorithm,
            private,
            Arc::downgrade(&self.keys),
        ))
    }

    fn allocate(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn context_fips(&self, context: ContextHandle) -> Result<bool, NativeError> {
        self.contexts
            .get(&context.raw())
            .map(|entry| *entry.value())
            .ok_or_else(|| NativeError::new(format!("unknown context handle {}", context)))
    }

    fn take_self_test_failure(&self) -> bool {
        self.remaining_self_test_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for SoftwareEngine {
    fn default() -> Self {
        Self::new(SoftwareEngineConfig::default())
    }
}

impl NativeEngine for SoftwareEngine {
    fn initialize(&self, fips: bool) -> Result<ContextHandle, NativeError> {
        if fips {
            if !self.config.fips_capable {
                return Err(NativeError::new(NOT_IN_FIPS_MODE));
            }
            if self.take_self_test_failure() {
                return Err(NativeError::new("FIPS entropy self test failed"));
            }
        }

        let handle = self.allocate();
        self.contexts.insert(handle, fips);
        debug!(handle, fips, "software engine context initialized");
        Ok(ContextHandle::new(handle))
    }

    fn validate_library_location(&self, context: ContextHandle) -> Result<(), NativeError> {
        self.context_fips(context)?;
        match &self.config.expected_install_path {
            Some(expected) if *expected != self.config.install_path => Err(NativeError::new(format!(
                "library loaded from {}, expected {}",
                self.config.install_path, expected
            ))),
            _ => Ok(()),
        }
    }

    fn validate_library_version(&self, context: ContextHandle) -> Result<(), NativeError> {
        self.context_fips(context)?;
        match &self.config.expected_version {
            Some(expected) if expected != ENGINE_VERSION => Err(NativeError::new(format!(
                "library version {} does not match signature file version {}",
                ENGINE_VERSION, expected
            ))),
            _ => Ok(()),
        }
    }

    fn scalar_value(&self, context: ContextHandle, value: ValueId) -> Result<String, NativeError> {
        let fips = self.context_fips(context)?;
        Ok(match value {
            ValueId::FipsApprovedMode => String::from(if fips { "1" } else { "0" }),
            ValueId::InstallPath => self.config.install_path.clone(),
            ValueId::Version => ENGINE_VERSION.to_string(),
        })
    }

    fn library_build_date(&self) -> String {
        self.config.build_date.clone()
    }

    fn digest_create(
        &self,
        context: ContextHandle,
        algorithm: &str,
    ) -> Result<DigestHandle, NativeError> {
        self.context_fips(context)?;
        let state = DigestState::for_algorithm(algorithm).ok_or_else(|| {
            NativeError::new(format!("unsupported digest algorithm {}", algorithm))
        })?;

        let handle = self.allocate();
        self.digests.insert(handle, state);
        Ok(DigestHandle::new(handle))
    }

    fn digest_update(
        &self,
        context: ContextHandle,
        digest: DigestHandle,
        data: &[u8],
    ) -> Result<(), NativeError> {
        self.context_fips(context)?;
        let mut state = self
            .digests
            .get_mut(&digest.raw())
            .ok_or_else(|| unknown_digest(digest))?;
        state.update(data);
        Ok(())
    }

    fn digest_reset(
        &self,
        context: ContextHandle,
        digest: DigestHandle,
    ) -> Result<(), NativeError> {
        self.context_fips(context)?;
        let mut state = self
            .digests
            .get_mut(&digest.raw())
            .ok_or_else(|| unknown_digest(digest))?;
        state.reset();
        Ok(())
    }

    fn digest_free(
        &self,
        _context: ContextHandle,
        digest: DigestHandle,
    ) -> Result<(), NativeError> {
        self.digests
            .remove(&digest.raw())
            .map(|_| ())
            .ok_or_else(|| unknown_digest(digest))
    }

    fn signature_sign(
        &self,
        context: ContextHandle,
        digest: DigestHandle,
        key: KeyHandle,
        convert_key_for_plain_rsa: bool,
    ) -> Result<Vec<u8>, NativeError> {
        self.context_fips(context)?;
        let state = self.digests.get(&digest.raw()).ok_or_else(|| unknown_digest(digest))?;
        let material = self.keys.get(&key.raw()).ok_or_else(|| unknown_key(key))?;
        material.sign(&state, convert_key_for_plain_rsa)
    }

    fn signature_verify(
        &self,
        context: ContextHandle,
        digest: DigestHandle,
        key: KeyHandle,
        signature: &[u8],
    ) -> Result<bool, NativeError> {
        self.context_fips(context)?;
        let state = self.digests.get(&digest.raw()).ok_or_else(|| unknown_digest(digest))?;
        let material = self.keys.get(&key.raw()).ok_or_else(|| unknown_key(key))?;
        Ok(material.verify(&state, signature))
    }
}

fn unknown_digest(digest: DigestHandle) -> NativeError {
    NativeError::new(format!("unknown digest handle {}", digest))
}

fn unknown_key(key: KeyHandle) -> NativeError {
    NativeError::new(format!("unknown key handle {}", key))
}

impl fmt::Debug for SoftwareEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareEngine")
            .field("config", &self.config)
            .field("contexts", &self.contexts.len())
            .field("digests", &self.digests.len())
            .field("keys", &self.keys.len())
            .finish()
    }
}
