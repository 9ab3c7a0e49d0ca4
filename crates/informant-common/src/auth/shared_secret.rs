//! Shared-secret gate
//!
//! A submission is authorized iff the key it presents is byte-for-byte equal
//! to the configured secret. The comparison time does not depend on where the
//! first mismatching byte is.

use std::fmt;

/// Configured pre-shared key
#[derive(Clone)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Create a gate for the given secret
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(secret.as_ref().to_vec())
    }

    /// Check a presented key against the secret
    #[must_use]
    pub fn authorizes(&self, presented: impl AsRef<[u8]>) -> bool {
        constant_time_eq::constant_time_eq(self.0.as_slice(), presented.as_ref())
    }

    /// Check if the configured secret is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedSecret").field(&"<redacted>").finish()
    }
}
