//! Container header
//!
//! ```text
//! [1 byte: version][16 bytes: salt][12 bytes: base nonce][1 byte: ext_len][ext_len bytes: ext]
//! ```
//!
//! `ext` is the original file extension including the leading dot (".pdf"),
//! or empty. It is joined onto a caller-chosen base path on decrypt, so it is
//! restricted to a single path component.

use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{DecodeError, EncodeError};
use crate::kdf::{generate_base_nonce, generate_salt};
use crate::{FORMAT_VERSION, NONCE_SIZE, SALT_SIZE};

/// Length of the fixed-size part of the header (everything before `ext`).
pub const FIXED_HEADER_LEN: usize = 1 + SALT_SIZE + NONCE_SIZE + 1;

/// Longest extension the one-byte length field can describe.
pub const MAX_EXTENSION_LEN: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub salt: [u8; SALT_SIZE],
    pub base_nonce: [u8; NONCE_SIZE],
    pub extension: String,
}

impl Header {
    pub fn new(
        salt: [u8; SALT_SIZE],
        base_nonce: [u8; NONCE_SIZE],
        extension: &str,
    ) -> Result<Self, EncodeError> {
        validate_extension(extension).map_err(EncodeError::InvalidExtension)?;
        Ok(Self {
            salt,
            base_nonce,
            extension: extension.to_string(),
        })
    }

    /// Header with fresh random salt and base nonce.
    pub fn generate(extension: &str) -> Result<Self, EncodeError> {
        Self::new(generate_salt(), generate_base_nonce(), extension)
    }

    pub fn encoded_len(&self) -> usize {
        FIXED_HEADER_LEN + self.extension.len()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.push(FORMAT_VERSION);
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&self.base_nonce);
        // validated in new(): fits in one byte
        buf.push(self.extension.len() as u8);
        buf.extend_from_slice(self.extension.as_bytes());
        w.write_all(&buf)
    }

    /// Read and validate a header, leaving `r` positioned at the first chunk.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
        let mut fixed = [0u8; FIXED_HEADER_LEN];
        read_field(r, &mut fixed)?;

        let version = fixed[0];
        if version != FORMAT_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&fixed[1..1 + SALT_SIZE]);
        let mut base_nonce = [0u8; NONCE_SIZE];
        base_nonce.copy_from_slice(&fixed[1 + SALT_SIZE..1 + SALT_SIZE + NONCE_SIZE]);

        let ext_len = fixed[FIXED_HEADER_LEN - 1] as usize;
        let mut ext = vec![0u8; ext_len];
        read_field(r, &mut ext)?;

        let extension = String::from_utf8(ext)
            .map_err(|_| DecodeError::MalformedHeader("extension is not valid UTF-8".into()))?;
        validate_extension(&extension).map_err(DecodeError::MalformedHeader)?;

        Ok(Self {
            salt,
            base_nonce,
            extension,
        })
    }
}

fn read_field<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), DecodeError> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DecodeError::Truncated,
        _ => DecodeError::Io(e),
    })
}

/// Check that `ext` is empty or a single dotted suffix like ".pdf".
pub fn validate_extension(ext: &str) -> Result<(), String> {
    if ext.is_empty() {
        return Ok(());
    }
    if ext.len() > MAX_EXTENSION_LEN {
        return Err(format!(
            "extension is {} bytes (maximum {MAX_EXTENSION_LEN})",
            ext.len()
        ));
    }
    if !ext.starts_with('.') {
        return Err(format!("extension {ext:?} must start with '.'"));
    }
    if ext.contains(['/', '\\', '\0']) {
        return Err(format!("extension {ext:?} contains a path separator"));
    }
    Ok(())
}

/// Extension of `path` including the leading dot, or "" if it has none.
///
/// Only the last suffix counts: `a.tar.gz` → `.gz`, `.bashrc` → "".
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
