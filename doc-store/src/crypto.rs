//! AES-256-GCM credential encryption.
//!
//! Tokens are stored as `iv:tag:ciphertext` (all hex). GCM authenticates the
//! ciphertext, so a tampered or wrong-key value fails to decrypt rather than
//! producing garbage.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};

use crate::errors::StoreError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

fn cipher_from_hex(key_hex: &str) -> Result<Aes256Gcm, StoreError> {
    let key_bytes = hex::decode(key_hex)
        .map_err(|_| StoreError::Crypto("encryption key is not valid hex".into()))?;
    if key_bytes.len() != 32 {
        return Err(StoreError::Crypto(format!(
            "encryption key must be 32 bytes, got {}",
            key_bytes.len()
        )));
    }
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes)))
}

/// Encrypts a plaintext token into the `iv:tag:ciphertext` hex format.
///
/// # Errors
/// Returns `StoreError::Crypto` on a malformed key or cipher failure.
pub fn encrypt(plaintext: &str, key_hex: &str) -> Result<String, StoreError> {
    let cipher = cipher_from_hex(key_hex)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut combined = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| StoreError::Crypto("encryption failed".into()))?;
    // aes-gcm appends the tag to the ciphertext; split it back out to keep
    // the stored format explicit.
    let tag = combined.split_off(combined.len() - TAG_LEN);

    Ok(format!(
        "{}:{}:{}",
        hex::encode(nonce),
        hex::encode(tag),
        hex::encode(combined)
    ))
}

/// Decrypts an `iv:tag:ciphertext` hex value back into the plaintext token.
///
/// # Errors
/// Returns `StoreError::Crypto` on a malformed value, wrong key, or failed
/// authentication (tampering).
pub fn decrypt(value: &str, key_hex: &str) -> Result<String, StoreError> {
    let cipher = cipher_from_hex(key_hex)?;

    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return Err(StoreError::Crypto(
            "invalid ciphertext format, expected iv:tag:ciphertext".into(),
        ));
    }

    let nonce_bytes =
        hex::decode(parts[0]).map_err(|_| StoreError::Crypto("iv is not valid hex".into()))?;
    let tag =
        hex::decode(parts[1]).map_err(|_| StoreError::Crypto("tag is not valid hex".into()))?;
    let mut combined = hex::decode(parts[2])
        .map_err(|_| StoreError::Crypto("ciphertext is not valid hex".into()))?;

    if nonce_bytes.len() != NONCE_LEN {
        return Err(StoreError::Crypto(format!(
            "iv must be {NONCE_LEN} bytes, got {}",
            nonce_bytes.len()
        )));
    }
    combined.extend_from_slice(&tag);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), combined.as_ref())
        .map_err(|_| StoreError::Crypto("decryption failed (tampered or wrong key)".into()))?;

    String::from_utf8(plaintext)
        .map_err(|_| StoreError::Crypto("decrypted token is not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn roundtrip() {
        let encrypted = encrypt("qiita-token-abc123", KEY).unwrap();
        assert_eq!(encrypted.split(':').count(), 3);
        assert_eq!(decrypt(&encrypted, KEY).unwrap(), "qiita-token-abc123");
    }

    #[test]
    fn distinct_ciphertexts_for_same_plaintext() {
        let a = encrypt("token", KEY).unwrap();
        let b = encrypt("token", KEY).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let encrypted = encrypt("token", KEY).unwrap();
        let mut parts: Vec<String> = encrypted.split(':').map(String::from).collect();
        // Flip a nibble in the ciphertext part.
        let flipped = if parts[2].starts_with('0') { "1" } else { "0" };
        parts[2].replace_range(0..1, flipped);
        let tampered = parts.join(":");

        assert!(matches!(
            decrypt(&tampered, KEY),
            Err(StoreError::Crypto(_))
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let other_key = "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";
        let encrypted = encrypt("token", KEY).unwrap();
        assert!(decrypt(&encrypted, other_key).is_err());
    }

    #[test]
    fn malformed_value_fails() {
        assert!(decrypt("not-a-ciphertext", KEY).is_err());
        assert!(decrypt("aa:bb", KEY).is_err());
    }
}
