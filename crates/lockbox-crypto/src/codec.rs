//! Streaming encode/decode of lockbox containers
//!
//! Both directions are a single forward pass holding at most one chunk in
//! memory. Neither direction cleans up partially written output; see
//! [`crate::file`] for the atomic file-level wrappers.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tracing::debug;

use crate::chunk::ChunkCipher;
use crate::error::{DecodeError, EncodeError};
use crate::header::Header;
use crate::kdf::{derive_key, KdfParams};
use crate::stream::BlockReader;
use crate::{CHUNK_SIZE, TAG_SIZE};

/// Result of a successful encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Extension recorded in the header
    pub extension: String,
    /// Number of chunks written (at least 1)
    pub chunks: u64,
    /// Plaintext bytes consumed
    pub bytes: u64,
}

/// Result of a successful decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Original extension recovered from the header
    pub extension: String,
    pub chunks: u64,
    /// Plaintext bytes written
    pub bytes: u64,
}

impl Decoded {
    /// Path for the restored file: `base` with the original extension appended.
    pub fn restored_name(&self, base: &Path) -> PathBuf {
        restored_name(base, &self.extension)
    }
}

/// Append `extension` to `base` verbatim (`out/report` + `.pdf`).
pub fn restored_name(base: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(extension);
    PathBuf::from(name)
}

/// Encrypt `input` into a container written to `output`.
///
/// `extension` is stored in the header so decrypt can restore the file name;
/// pass [`crate::extension_of`] of the source path, or "" for none.
pub fn encode<R: Read, W: Write>(
    input: R,
    extension: &str,
    password: SecretString,
    mut output: W,
    params: &KdfParams,
) -> Result<EncodeSummary, EncodeError> {
    let header = Header::generate(extension)?;
    let key = derive_key(password, &header.salt, params)?;
    let cipher = ChunkCipher::new(&key, header.base_nonce);
    drop(key);

    header.write_to(&mut output)?;

    let mut chunks = 0u64;
    let mut bytes = 0u64;
    for block in BlockReader::new(input, CHUNK_SIZE) {
        let block = block?;
        let sealed = cipher.seal(block.index, block.last, &block.data)?;
        output.write_all(&sealed)?;
        chunks += 1;
        bytes += block.data.len() as u64;
    }
    output.flush()?;

    debug!(chunks, bytes, extension = %header.extension, "container encoded");

    Ok(EncodeSummary {
        extension: header.extension,
        chunks,
        bytes,
    })
}

/// A container whose header has been read and whose key has been derived.
///
/// Consumed by [`Decoder::decrypt_to`]; a failed or finished decode cannot be
/// resumed.
pub struct Decoder<R> {
    input: R,
    header: Header,
    cipher: ChunkCipher,
}

impl<R: Read> Decoder<R> {
    /// Read the header from `input` and derive the key for `password`.
    ///
    /// A wrong password is not detected here; it surfaces as
    /// [`DecodeError::AuthenticationFailed`] on the first chunk.
    pub fn open(
        mut input: R,
        password: SecretString,
        params: &KdfParams,
    ) -> Result<Self, DecodeError> {
        let header = Header::read_from(&mut input)?;
        let key = derive_key(password, &header.salt, params)?;
        let cipher = ChunkCipher::new(&key, header.base_nonce);

        Ok(Self {
            input,
            header,
            cipher,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn extension(&self) -> &str {
        &self.header.extension
    }

    /// Decrypt every chunk into `output`, stopping at the first chunk that
    /// fails authentication. Plaintext of earlier chunks has already been
    /// written to `output` by then.
    pub fn decrypt_to<W: Write>(self, mut output: W) -> Result<Decoded, DecodeError> {
        let Decoder {
            input,
            header,
            cipher,
        } = self;

        let mut chunks = 0u64;
        let mut bytes = 0u64;
        for block in BlockReader::new(input, CHUNK_SIZE + TAG_SIZE) {
            let block = block?;
            // Only possible for the first block: a header with no chunks at all
            if block.data.is_empty() {
                return Err(DecodeError::Truncated);
            }
            let plaintext = cipher.open(block.index, block.last, &block.data)?;
            output.write_all(&plaintext)?;
            chunks += 1;
            bytes += plaintext.len() as u64;
        }
        output.flush()?;

        debug!(chunks, bytes, extension = %header.extension, "container decoded");

        Ok(Decoded {
            extension: header.extension,
            chunks,
            bytes,
        })
    }
}

/// Decrypt the container in `input` into `output`.
pub fn decode<R: Read, W: Write>(
    input: R,
    password: SecretString,
    output: W,
    params: &KdfParams,
) -> Result<Decoded, DecodeError> {
    Decoder::open(input, password, params)?.decrypt_to(output)
}
