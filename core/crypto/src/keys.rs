//! Key types with secure memory handling.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Domain separator mixed into every link key derivation.
const LINK_KEY_CONTEXT: &[u8] = b"debridgate/proxy-link/v1";

/// Symmetric key used to seal proxy link payloads.
///
/// Derived deterministically from a shared secret so that the gateway can
/// re-derive it when the link comes back.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LinkKey {
    key: [u8; KEY_LENGTH],
}

impl LinkKey {
    /// Derive a link key from a shared secret.
    pub fn derive(secret: &str) -> Self {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(LINK_KEY_CONTEXT);
        hasher.update(secret.as_bytes());

        let result = hasher.finalize();
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&result);
        Self { key }
    }

    /// Create a link key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkKey([REDACTED])")
    }
}
