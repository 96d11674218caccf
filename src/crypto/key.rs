//! Revision content keys
//!
//! A [`ContentKey`] is the symmetric key for one revision of one node. It is
//! always derived from a ratchet state, never drawn at random, so that anyone
//! holding the same ratchet state derives the same key.

use std::fmt;
use std::ops::Deref;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use serde::{Deserialize, Serialize};

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("ciphertext shorter than the nonce prefix")]
    Malformed,
    #[error("decryption failed: wrong key or corrupted block")]
    DecryptionFailed,
    #[error("failed to draw a nonce: {0}")]
    Nonce(#[from] getrandom::Error),
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A 256-bit ChaCha20-Poly1305 key for one node revision.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKey([u8; KEY_SIZE]);

impl ContentKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid key length: expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            )
            .into());
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    pub fn bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext+tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.0));
        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|err| anyhow::anyhow!("encryption failed: {err}"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext+tag` block produced by [`encrypt`].
    ///
    /// [`encrypt`]: ContentKey::encrypt
    pub fn decrypt(&self, block: &[u8]) -> Result<Vec<u8>, KeyError> {
        if block.len() < NONCE_SIZE {
            return Err(KeyError::Malformed);
        }
        let (nonce_bytes, ciphertext) = block.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.0));
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| KeyError::DecryptionFailed)
    }
}

impl From<[u8; KEY_SIZE]> for ContentKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Deref for ContentKey {
    type Target = [u8; KEY_SIZE];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey(..)")
    }
}
