//! Authenticated encryption using XChaCha20-Poly1305.
//!
//! XChaCha20-Poly1305 provides both confidentiality and authenticity,
//! with a 24-byte nonce that is safe for random generation.

use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305,
};

use debridgate_common::{Error, Result};

use crate::encoding::{base64_decode, base64_encode};
use crate::keys::LinkKey;

/// Format tag recorded next to payloads sealed by [`seal_string`].
pub const ENCRYPTION_FORMAT: &str = "xchacha20poly1305";

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Encrypt plaintext using XChaCha20-Poly1305.
///
/// # Postconditions
/// - Returns nonce || ciphertext || tag
/// - The nonce is randomly generated
///
/// # Errors
/// - Returns error if encryption fails
pub fn encrypt(key: &LinkKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypt ciphertext using XChaCha20-Poly1305.
///
/// # Preconditions
/// - Ciphertext format: nonce || encrypted_data || tag
///
/// # Errors
/// - Returns error if ciphertext is too short
/// - Returns error if authentication fails (tampered data or wrong key)
pub fn decrypt(key: &LinkKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::Crypto("Ciphertext too short".to_string()));
    }

    let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_SIZE);
    let nonce = GenericArray::from_slice(nonce_bytes);

    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));

    cipher
        .decrypt(nonce, encrypted)
        .map_err(|e| Error::Crypto(format!("Decryption failed: {}", e)))
}

/// Encrypt a string under a key derived from `secret` and base64 it.
pub fn seal_string(secret: &str, plaintext: &str) -> Result<String> {
    let key = LinkKey::derive(secret);
    let sealed = encrypt(&key, plaintext.as_bytes())?;
    Ok(base64_encode(sealed))
}

/// Reverse of [`seal_string`].
pub fn open_string(secret: &str, sealed: &str) -> Result<String> {
    let bytes = base64_decode(sealed)
        .map_err(|e| Error::Crypto(format!("Sealed payload is not base64: {}", e)))?;
    let key = LinkKey::derive(secret);
    let plaintext = decrypt(&key, &bytes)?;
    String::from_utf8(plaintext)
        .map_err(|e| Error::Crypto(format!("Decrypted payload is not UTF-8: {}", e)))
}
