//! AES-256-GCM encryption of stored Notion credentials.
//!
//! The key is the SHA-256 digest of the configured secret. Ciphertexts are
//! stored as standard base64 of `nonce || ciphertext || tag` with a fresh
//! random 96-bit nonce per call.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};

use crate::utils::errors::{Result, TodoBridgeError};

/// Process-wide credential cipher, constructed once and shared by reference
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; 32],
    rng: SystemRandom,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}

impl TokenCipher {
    pub fn new(secret: &str) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(digest(&SHA256, secret.as_bytes()).as_ref());
        Self {
            key,
            rng: SystemRandom::new(),
        }
    }

    fn sealing_key(&self) -> Result<LessSafeKey> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.key)
            .map_err(|_| TodoBridgeError::Crypto("failed to create AES-256-GCM key".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypt a plaintext token
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Err(TodoBridgeError::Crypto("refusing to encrypt an empty token".to_string()));
        }

        let key = self.sealing_key()?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| TodoBridgeError::Crypto("failed to generate random nonce".to_string()))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce_bytes), Aad::empty(), &mut in_out)
            .map_err(|_| TodoBridgeError::Crypto("AES-256-GCM encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt a stored token
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| TodoBridgeError::Crypto(format!("invalid ciphertext encoding: {}", e)))?;

        if data.len() < NONCE_LEN {
            return Err(TodoBridgeError::Crypto("malformed ciphertext".to_string()));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| TodoBridgeError::Crypto("malformed nonce".to_string()))?;

        let key = self.sealing_key()?;
        let mut in_out = ciphertext.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| TodoBridgeError::Crypto("decryption failed: wrong key or corrupted data".to_string()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| TodoBridgeError::Crypto("decrypted token is not valid UTF-8".to_string()))
    }
}
