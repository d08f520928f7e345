//! Binding layer over a native cryptographic engine
//!
//! This crate owns the lifecycle of a native engine context and drives the
//! one-shot sign / verify protocol against it. The engine itself is reached
//! only through the [`NativeEngine`] trait.
//!
//! # Components
//!
//! - [`EngineContext`]: retrying initialization (FIPS self-check flakes are
//!   retried, genuine "not in FIPS mode" failures are not), optional library
//!   location / version validation, and metadata fetched from the engine at
//!   most once however many threads ask.
//! - [`SignatureEngine`]: initialize → update* → sign | verify, with the
//!   digest reset on every exit from the native call.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use engine_core::{EngineContext, SignatureEngine};
//!
//! let context = Arc::new(EngineContext::create(engine, false)?);
//! println!("engine {} built {}", context.version()?, context.library_build_date());
//!
//! let signer = SignatureEngine::new(Arc::clone(&context), "SHA256")?;
//! signer.initialize(private_key, false)?;
//! signer.update_all(b"message")?;
//! let signature = signer.sign()?;
//!
//! let verifier = SignatureEngine::new(context, "SHA256")?;
//! verifier.initialize(public_key, false)?;
//! verifier.update_all(b"message")?;
//! assert!(verifier.verify(&signature)?);
//! ```

pub mod config;
pub mod context;
pub mod digest;
pub mod error;
pub mod handle;
pub mod key;
pub mod native;
pub mod signature;

mod lazy;

pub use config::{ContextConfig, RetryExhaustion, DEFAULT_MAX_FIPS_ATTEMPTS};
pub use context::{library_build_date, EngineContext};
pub use digest::Digest;
pub use error::{EngineError, EngineResult};
pub use handle::{ContextHandle, DigestHandle, KeyHandle, ValueId};
pub use key::AsymmetricKey;
pub use native::{NativeEngine, NativeError, NOT_IN_FIPS_MODE};
pub use signature::SignatureEngine;
