use lockbox_crypto::{DecodeError, EncodeError};
use thiserror::Error;

pub type LockboxResult<T> = Result<T, LockboxError>;

#[derive(Debug, Error)]
pub enum LockboxError {
    #[error("encryption failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("decryption failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LockboxError {
    /// True when decryption failed because of the container or password
    /// rather than a local fault (these map to "corrupted file" for users).
    pub fn is_bad_container(&self) -> bool {
        matches!(self, LockboxError::Decode(e) if e.is_user_facing_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_container_failures_are_bad_containers() {
        let auth = LockboxError::from(DecodeError::AuthenticationFailed { chunk: 0 });
        assert!(auth.is_bad_container());
        assert!(LockboxError::from(DecodeError::UnsupportedVersion(9)).is_bad_container());

        let io = LockboxError::from(std::io::Error::other("disk full"));
        assert!(!io.is_bad_container());
        assert!(!LockboxError::Config("bad toml".into()).is_bad_container());
        let encode = LockboxError::from(EncodeError::InvalidExtension("x".into()));
        assert!(!encode.is_bad_container());
        let decode_io = LockboxError::from(DecodeError::Io(std::io::Error::other("eof")));
        assert!(!decode_io.is_bad_container());
    }

    #[test]
    fn messages_name_the_failing_stage() {
        let err = LockboxError::from(DecodeError::Truncated);
        assert_eq!(
            err.to_string(),
            "decryption failed: corrupted file: container is truncated"
        );
        assert!(LockboxError::Config("x".into()).to_string().starts_with("config error"));
    }
}
