//! Per-chunk AES-256-GCM encryption/decryption
//!
//! Sealed chunk format (binary):
//! ```text
//! [N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! No nonce is stored per chunk. Each nonce is derived from the header's base
//! nonce, the chunk index and a final-chunk flag:
//! ```text
//! nonce_i = base_nonce XOR (0x00 0x00 0x00 || be64(i) || final)
//! ```
//! Every (index, final) pair yields a distinct nonce under one key, so no
//! nonce is ever reused within a container. Binding the position into the
//! nonce also makes reordered, dropped or appended chunks fail authentication.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use crate::error::{DecodeError, EncodeError};
use crate::kdf::ContainerKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Derive the nonce for chunk `index` from the container's base nonce.
pub fn chunk_nonce(base: &[u8; NONCE_SIZE], index: u64, last: bool) -> [u8; NONCE_SIZE] {
    let mut nonce = *base;
    for (n, c) in nonce[3..11].iter_mut().zip(index.to_be_bytes()) {
        *n ^= c;
    }
    if last {
        nonce[11] ^= 0x01;
    }
    nonce
}

/// AES-256-GCM bound to one container's key and base nonce.
pub struct ChunkCipher {
    cipher: Aes256Gcm,
    base_nonce: [u8; NONCE_SIZE],
}

impl ChunkCipher {
    pub fn new(key: &ContainerKey, base_nonce: [u8; NONCE_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
            base_nonce,
        }
    }

    /// Encrypt one plaintext block.
    ///
    /// Returns: `[ciphertext][16-byte tag]`
    pub fn seal(&self, index: u64, last: bool, plaintext: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let nonce_bytes = chunk_nonce(&self.base_nonce, index, last);
        self.cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| EncodeError::Seal { chunk: index })
    }

    /// Decrypt one sealed block. Fails closed on any tag mismatch.
    pub fn open(&self, index: u64, last: bool, sealed: &[u8]) -> Result<Vec<u8>, DecodeError> {
        if sealed.len() < TAG_SIZE {
            return Err(DecodeError::AuthenticationFailed { chunk: index });
        }

        let nonce_bytes = chunk_nonce(&self.base_nonce, index, last);
        self.cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), sealed)
            .map_err(|_| DecodeError::AuthenticationFailed { chunk: index })
    }
}
