//! In-process [`NativeEngine`](engine_core::NativeEngine) backed by RustCrypto
//!
//! Used wherever a real native library is unavailable: tests, tooling and
//! hosts that only need software signing. Supports SHA-256/384/512 digests,
//! RSA PKCS#1 v1.5 (including plain RSA over the bare hash) and ECDSA P-256
//! with DER-encoded signatures.
//!
//! FIPS behaviour is simulated: [`SoftwareEngineConfig::fips_capable`] decides
//! whether FIPS contexts exist at all, and
//! [`SoftwareEngineConfig::fips_self_test_failures`] makes the first few FIPS
//! initializations fail the way a flaky entropy self test does.

pub mod config;
pub mod engine;
pub mod error;
pub mod keys;

mod digest;

pub use config::{SoftwareEngineConfig, ENGINE_VERSION};
pub use engine::{SoftwareEngine, MIN_RSA_BITS};
pub use error::{SoftwareEngineError, SoftwareEngineResult};
pub use keys::{SoftwareKey, SoftwareKeyPair, EC, RSA};
