//! Session store encryption
//!
//! The passphrase never reaches disk. An AES-256-GCM key is derived from it
//! with Argon2id and a random per-store salt, and every seal uses a fresh
//! nonce. Sealed output is `nonce || ciphertext`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use rand::RngCore;
use std::fmt;
use thiserror::Error;

/// Salt length stored next to the sealed data
pub const SALT_LEN: usize = 16;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum StoreKeyError {
    #[error("Store key derivation failed: {0}")]
    Derivation(String),

    #[error("Store encryption failed")]
    Seal,

    /// Wrong passphrase or tampered data; AES-GCM cannot tell them apart
    #[error("Store could not be decrypted with the configured key")]
    Open,

    #[error("Sealed store data is truncated")]
    Truncated,
}

/// Cipher bound to one store passphrase and salt
pub struct StoreCipher {
    cipher: Aes256Gcm,
    salt: [u8; SALT_LEN],
}

impl StoreCipher {
    /// Derive the cipher for an existing store
    ///
    /// # Errors
    /// Returns an error if Argon2 rejects its inputs
    pub fn derive(passphrase: &str, salt: [u8; SALT_LEN]) -> Result<Self, StoreKeyError> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), &salt, &mut key)
            .map_err(|e| StoreKeyError::Derivation(e.to_string()))?;

        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
            salt,
        })
    }

    /// Derive a cipher under a fresh random salt, for a new store
    ///
    /// # Errors
    /// Returns an error if Argon2 rejects its inputs
    pub fn generate(passphrase: &str) -> Result<Self, StoreKeyError> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::derive(passphrase, salt)
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// Encrypt `plaintext` under a new nonce
    ///
    /// # Errors
    /// Returns an error if encryption fails
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreKeyError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| StoreKeyError::Seal)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt data produced by `seal`
    ///
    /// # Errors
    /// Returns `Open` for a wrong key or tampered data
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, StoreKeyError> {
        if sealed.len() < NONCE_LEN {
            return Err(StoreKeyError::Truncated);
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| StoreKeyError::Open)
    }
}

impl fmt::Debug for StoreCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCipher").finish_non_exhaustive()
    }
}
