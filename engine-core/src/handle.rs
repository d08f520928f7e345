//! Opaque identifiers for state owned by the native engine.
//!
//! Handles are plain integers handed out by the engine. Zero is never a live
//! handle, so every handle type carries an `INVALID` constant and a validity
//! check that runs before the handle is passed back across the boundary.

use std::fmt;

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const INVALID: Self = Self(0);

            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }

            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

native_handle! {
    /// Engine context created by native initialization
    ContextHandle
}

native_handle! {
    /// Native message digest state
    DigestHandle
}

native_handle! {
    /// Native public or private key material
    KeyHandle
}

/// Scalar values that can be read from an engine context.
///
/// The discriminants are the codes the native engine expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueId {
    FipsApprovedMode = 0,
    InstallPath = 1,
    Version = 2,
}

impl ValueId {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_invalid() {
        assert!(!ContextHandle::INVALID.is_valid());
        assert!(!DigestHandle::default().is_valid());
        assert!(!KeyHandle::new(0).is_valid());
        assert!(KeyHandle::new(7).is_valid());
    }

    #[test]
    fn test_value_codes_match_native_contract() {
        assert_eq!(ValueId::FipsApprovedMode.code(), 0);
        assert_eq!(ValueId::InstallPath.code(), 1);
        assert_eq!(ValueId::Version.code(), 2);
    }
}
