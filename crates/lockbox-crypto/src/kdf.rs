//! Key derivation: Argon2id password → container key

use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::error::KeyDerivationError;
use crate::{KEY_SIZE, NONCE_SIZE, SALT_SIZE};

/// A 256-bit key derived from a password via Argon2id.
///
/// Lives for one encode/decode call and is zeroized on drop.
pub struct ContainerKey {
    bytes: [u8; KEY_SIZE],
}

impl ContainerKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for ContainerKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for ContainerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters.
///
/// Not recorded in the container: anything other than the default produces
/// files that only a decoder with the same parameters can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 4)
    pub time_cost: u32,
    /// Parallelism (default: 1)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 4,
            parallelism: 1,
        }
    }
}

/// Derive a 256-bit container key from a password and salt using Argon2id.
///
/// The password is consumed: it is dropped, and with it zeroized, before this
/// function returns on every path.
pub fn derive_key(
    password: SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> Result<ContainerKey, KeyDerivationError> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| KeyDerivationError::InvalidParams(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    // Hash straight into the key so a failed run is wiped by ContainerKey::drop
    let mut key = ContainerKey::from_bytes([0u8; KEY_SIZE]);
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key.bytes)
        .map_err(|e| KeyDerivationError::Failed(e.to_string()))?;

    tracing::debug!(
        mem_cost_kib = params.mem_cost_kib,
        time_cost = params.time_cost,
        parallelism = params.parallelism,
        "derived container key"
    );

    Ok(key)
}

/// Fresh random salt from the OS CSPRNG.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Fresh random base nonce from the OS CSPRNG.
pub fn generate_base_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}
