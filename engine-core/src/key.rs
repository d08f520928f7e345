use std::fmt;

use crate::handle::KeyHandle;

/// Public or private key material held by the native engine.
///
/// The binding layer only ever needs the handle; key encodings and key
/// factories live with the algorithm providers.
pub trait AsymmetricKey: Send + Sync + fmt::Debug {
    fn native_id(&self) -> KeyHandle;

    /// Algorithm family name, e.g. `"RSA"` or `"EC"`
    fn algorithm(&self) -> &str;
}
