use rsa::Pkcs1v15Sign;
use sha2::{Digest as _, Sha256, Sha384, Sha512};

/// Running hash state behind a digest handle.
#[derive(Clone)]
pub(crate) enum DigestState {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl DigestState {
    /// Accepts `SHA256`, `SHA-256`, `sha-256` and the like.
    pub(crate) fn for_algorithm(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_uppercase();

        match normalized.as_str() {
            "SHA256" => Some(DigestState::Sha256(Sha256::new())),
            "SHA384" => Some(DigestState::Sha384(Sha384::new())),
            "SHA512" => Some(DigestState::Sha512(Sha512::new())),
            _ => None,
        }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        match self {
            DigestState::Sha256(h) => h.update(data),
            DigestState::Sha384(h) => h.update(data),
            DigestState::Sha512(h) => h.update(data),
        }
    }

    pub(crate) fn reset(&mut self) {
        match self {
            DigestState::Sha256(h) => sha2::Digest::reset(h),
            DigestState::Sha384(h) => sha2::Digest::reset(h),
            DigestState::Sha512(h) => sha2::Digest::reset(h),
        }
    }

    /// Hash of everything accumulated so far; the running state is untouched.
    pub(crate) fn prehash(&self) -> Vec<u8> {
        match self.clone() {
            DigestState::Sha256(h) => h.finalize().to_vec(),
            DigestState::Sha384(h) => h.finalize().to_vec(),
            DigestState::Sha512(h) => h.finalize().to_vec(),
        }
    }

    /// PKCS#1 v1.5 padding for this hash. A plain RSA key signs the bare hash
    /// without the DigestInfo prefix.
    pub(crate) fn rsa_padding(&self, plain: bool) -> Pkcs1v15Sign {
        if plain {
            return Pkcs1v15Sign::new_unprefixed();
        }
        match self {
            DigestState::Sha256(_) => Pkcs1v15Sign::new::<Sha256>(),
            DigestState::Sha384(_) => Pkcs1v15Sign::new::<Sha384>(),
            DigestState::Sha512(_) => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}
