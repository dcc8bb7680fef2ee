//! # Sensitive Data Cipher
//!
//! AES-256-GCM over the optional `sensitive_info` registration field.
//!
//! Stored form: `base64(nonce || ciphertext)` with a fresh 96-bit nonce per
//! encryption, so the same plaintext never produces the same blob twice.

use crate::domain::errors::{CredentialError, CredentialResult};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Symmetric cipher for the sensitive-data column.
#[derive(Clone)]
pub struct SensitiveDataCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for SensitiveDataCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SensitiveDataCipher(<redacted>)")
    }
}

impl SensitiveDataCipher {
    /// Build from raw key bytes. The key must be exactly 32 bytes.
    pub fn from_key_bytes(key: &[u8]) -> CredentialResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CredentialError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Build from a standard base64 encoded key.
    pub fn from_base64_key(encoded: &str) -> CredentialResult<Self> {
        let key = BASE64
            .decode(encoded.trim().as_bytes())
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
        Self::from_key_bytes(&key)
    }

    /// Fresh random key, base64 encoded. Used for development setups.
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    pub fn encrypt(&self, plaintext: &str) -> CredentialResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CredentialError::Cipher(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    pub fn decrypt(&self, stored: &str) -> CredentialResult<String> {
        let blob = BASE64
            .decode(stored.as_bytes())
            .map_err(|e| CredentialError::Cipher(e.to_string()))?;
        if blob.len() <= NONCE_LEN {
            return Err(CredentialError::Cipher("blob shorter than nonce".into()));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CredentialError::Cipher(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| CredentialError::Cipher(e.to_string()))
    }
}
