use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyDerivationError {
    #[error("invalid Argon2id parameters: {0}")]
    InvalidParams(String),

    #[error("Argon2id key derivation failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid file extension: {0}")]
    InvalidExtension(String),

    #[error(transparent)]
    KeyDerivation(#[from] KeyDerivationError),

    #[error("chunk {chunk} encryption failed")]
    Seal { chunk: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("corrupted file: container is truncated")]
    Truncated,

    #[error("corrupted file: unsupported container version {0}")]
    UnsupportedVersion(u8),

    #[error("corrupted file: {0}")]
    MalformedHeader(String),

    #[error(transparent)]
    KeyDerivation(#[from] KeyDerivationError),

    /// Wrong password and tampered data produce the same error.
    #[error("incorrect password or corrupted file")]
    AuthenticationFailed { chunk: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Errors that mean "this container cannot be opened with this password",
    /// as opposed to local I/O or KDF faults.
    pub fn is_user_facing_failure(&self) -> bool {
        matches!(
            self,
            DecodeError::Truncated
                | DecodeError::UnsupportedVersion(_)
                | DecodeError::MalformedHeader(_)
                | DecodeError::AuthenticationFailed { .. }
        )
    }
}
