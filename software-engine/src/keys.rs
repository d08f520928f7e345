use std::sync::{Arc, Weak};

use dashmap::DashMap;
use engine_core::{AsymmetricKey, KeyHandle, NativeError};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::digest::DigestState;

pub const RSA: &str = "RSA";
pub const EC: &str = "EC";

pub(crate) type KeyRegistry = DashMap<u64, KeyMaterial>;

/// Key material held behind a key handle.
pub(crate) enum KeyMaterial {
    RsaPrivate(Box<RsaPrivateKey>),
    RsaPublic(RsaPublicKey),
    EcPrivate(SigningKey),
    EcPublic(VerifyingKey),
}

impl KeyMaterial {
    pub(crate) fn sign(
        &self,
        digest: &DigestState,
        plain_rsa: bool,
    ) -> Result<Vec<u8>, NativeError> {
        let prehash = digest.prehash();
        match self {
            KeyMaterial::RsaPrivate(key) => key
                .sign_with_rng(&mut OsRng, digest.rsa_padding(plain_rsa), &prehash)
                .map_err(|e| NativeError::new(format!("RSA sign failed: {}", e))),
            KeyMaterial::EcPrivate(key) => {
                let signature: EcdsaSignature = key
                    .sign_prehash(&prehash)
                    .map_err(|e| NativeError::new(format!("ECDSA sign failed: {}", e)))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyMaterial::RsaPublic(_) | KeyMaterial::EcPublic(_) => {
                Err(NativeError::new("cannot sign with a public key"))
            }
        }
    }

    /// Any parse or cryptographic failure is a non-matching signature.
    ///
    /// The verify call carries no plain-RSA flag, so an RSA signature is
    /// accepted with or without the DigestInfo prefix.
    pub(crate) fn verify(&self, digest: &DigestState, signature: &[u8]) -> bool {
        let prehash = digest.prehash();
        match self {
            KeyMaterial::RsaPrivate(key) => {
                verify_rsa(&key.to_public_key(), digest, &prehash, signature)
            }
            KeyMaterial::RsaPublic(key) => verify_rsa(key, digest, &prehash, signature),
            KeyMaterial::EcPrivate(key) => verify_ecdsa(key.verifying_key(), &prehash, signature),
            KeyMaterial::EcPublic(key) => verify_ecdsa(key, &prehash, signature),
        }
    }
}

fn verify_rsa(key: &RsaPublicKey, digest: &DigestState, prehash: &[u8], signature: &[u8]) -> bool {
    key.verify(digest.rsa_padding(false), prehash, signature).is_ok()
        || key.verify(digest.rsa_padding(true), prehash, signature).is_ok()
}

fn verify_ecdsa(key: &VerifyingKey, prehash: &[u8], signature: &[u8]) -> bool {
    match EcdsaSignature::from_der(signature) {
        Ok(signature) => key.verify_prehash(prehash, &signature).is_ok(),
        Err(_) => false,
    }
}

/// A key registered with a [`SoftwareEngine`](crate::SoftwareEngine).
///
/// The engine keeps the key material until the last `Arc<SoftwareKey>` is
/// dropped or [`SoftwareEngine::free_key`](crate::SoftwareEngine::free_key)
/// releases it earlier.
#[derive(Debug)]
pub struct SoftwareKey {
    handle: KeyHandle,
    algorithm: &'static str,
    private: bool,
    registry: Weak<KeyRegistry>,
}

impl SoftwareKey {
    pub(crate) fn new(
        handle: KeyHandle,
        algorithm: &'static str,
        private: bool,
        registry: Weak<KeyRegistry>,
    ) -> Self {
        Self {
            handle,
            algorithm,
            private,
            registry,
        }
    }

    pub fn is_private(&self) -> bool {
        self.private
    }
}

impl PartialEq for SoftwareKey {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for SoftwareKey {}

impl Drop for SoftwareKey {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.handle.raw());
        }
    }
}

impl AsymmetricKey for SoftwareKey {
    fn native_id(&self) -> KeyHandle {
        self.handle
    }

    fn algorithm(&self) -> &str {
        self.algorithm
    }
}

/// Both halves of a generated key pair. Each half frees its own key
/// material when its last reference goes away.
#[derive(Debug, Clone)]
pub struct SoftwareKeyPair {
    pub private: Arc<SoftwareKey>,
    pub public: Arc<SoftwareKey>,
}
