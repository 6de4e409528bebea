//! Cryptographic primitives for debridgate.
//!
//! This module provides:
//! - Link key derivation from a shared secret using BLAKE2b
//! - Authenticated encryption using XChaCha20-Poly1305
//! - Base64 helpers for embedding binary payloads in URLs
//!
//! # Security Guarantees
//! - Derived key material is zeroized on drop
//! - No plaintext or key material is ever logged

pub mod aead;
pub mod encoding;
pub mod keys;

pub use aead::{decrypt, encrypt, open_string, seal_string, ENCRYPTION_FORMAT};
pub use encoding::{base64_decode, base64_decode_string, base64_encode};
pub use keys::{LinkKey, KEY_LENGTH};
