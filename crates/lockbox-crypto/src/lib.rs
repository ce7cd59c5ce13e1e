//! lockbox-crypto: password-based streaming file encryption
//!
//! Architecture: Argon2id key derivation + chunked AES-256-GCM
//!
//! Container layout (format version 2):
//! ```text
//! version(1) || salt(16) || base_nonce(12) || ext_len(1) || ext(ext_len)
//!   || chunk_0 || chunk_1 || ... || chunk_{n-1}
//!
//! chunk_i = AES-256-GCM(key, nonce_i, plaintext_i) = ciphertext_i || tag_i(16)
//! nonce_i = base_nonce XOR (0^3 || be64(i) || final_flag)
//! ```
//!
//! Plaintext is cut into 64 KiB blocks; only the last block may be shorter,
//! and an empty input still produces one (empty) final chunk. The final flag
//! in the nonce makes truncation at a chunk boundary fail authentication.

pub mod chunk;
pub mod codec;
pub mod error;
pub mod file;
pub mod header;
pub mod kdf;
pub mod stream;

pub use chunk::{chunk_nonce, ChunkCipher};
pub use codec::{decode, encode, restored_name, Decoded, Decoder, EncodeSummary};
pub use error::{DecodeError, EncodeError, KeyDerivationError};
pub use file::{decrypt_file, encrypt_file};
pub use header::{extension_of, Header};
pub use kdf::{derive_key, ContainerKey, KdfParams};
pub use stream::{Block, BlockReader};

/// Size of the derived container key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the Argon2id salt stored in the header
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Plaintext bytes per chunk (every chunk but the last is exactly this long)
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Container format version written by this crate
pub const FORMAT_VERSION: u8 = 2;
