//! Optional payload encryption keyed by the client pass phrase.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{ClientError, Result};

/// Nonce length for AES-GCM (12 bytes)
const NONCE_LEN: usize = 12;

/// GCM authentication tag length
const TAG_LEN: usize = 16;

/// Payload codec using AES-256-GCM.
///
/// The key is derived as SHA-256 of the configured pass phrase, so two
/// codecs built from the same pass phrase interoperate. Each encoded payload
/// carries its own random nonce (first 12 bytes), followed by ciphertext and
/// authentication tag.
///
/// Only constructed when `ClientConfig::is_encryption_required` is set.
pub struct CryptoCodec {
    key: [u8; 32],
}

impl CryptoCodec {
    /// Derive a codec from the client pass phrase.
    pub fn new(pass_phrase: &str) -> Self {
        let digest = Sha256::digest(pass_phrase.as_bytes());
        Self { key: digest.into() }
    }

    /// Encrypt a payload.
    pub fn encode(&self, plaintext: &[u8]) -> Result<Bytes> {
        let key = Key::<Aes256Gcm>::from_slice(&self.key);
        let cipher = Aes256Gcm::new(key);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| ClientError::EncryptionFailed(e.to_string()))?;

        // First 12 bytes = nonce, rest = ciphertext + tag
        let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        framed.extend_from_slice(&nonce_bytes);
        framed.extend_from_slice(&ciphertext);

        Ok(Bytes::from(framed))
    }

    /// Decrypt a payload previously produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns `DecryptionFailed` for truncated, tampered, or
    /// wrong-pass-phrase input.
    pub fn decode(&self, ciphertext: &[u8]) -> Result<Bytes> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(ClientError::DecryptionFailed);
        }

        let nonce = Nonce::from_slice(&ciphertext[..NONCE_LEN]);

        let key = Key::<Aes256Gcm>::from_slice(&self.key);
        let cipher = Aes256Gcm::new(key);

        let plaintext = cipher
            .decrypt(nonce, &ciphertext[NONCE_LEN..])
            .map_err(|_| ClientError::DecryptionFailed)?;

        Ok(Bytes::from(plaintext))
    }
}

// Custom Debug implementation to avoid logging key material
impl fmt::Debug for CryptoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoCodec")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
