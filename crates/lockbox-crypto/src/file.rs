//! File-level encrypt/decrypt with atomic output
//!
//! Output is streamed into a temp file next to the destination and renamed
//! into place only once the whole container (or every chunk of plaintext)
//! has been written and verified. On any error the temp file is removed, so a
//! failed call never leaves a truncated artifact behind.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tempfile::NamedTempFile;
use tracing::info;

use crate::codec::{encode, restored_name, Decoder, EncodeSummary};
use crate::error::{DecodeError, EncodeError};
use crate::header::extension_of;
use crate::kdf::KdfParams;

/// Encrypt the file at `input` into a container at `output`.
///
/// The extension of `input` is recorded in the header.
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    password: SecretString,
    params: &KdfParams,
) -> Result<EncodeSummary, EncodeError> {
    let extension = extension_of(input);
    let reader = File::open(input)?;

    let mut tmp = temp_beside(output)?;
    let summary = encode(reader, &extension, password, tmp.as_file_mut(), params)?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(output).map_err(|e| EncodeError::Io(e.error))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        chunks = summary.chunks,
        bytes = summary.bytes,
        "file encrypted"
    );
    Ok(summary)
}

/// Decrypt the container at `input`, writing the plaintext to
/// `output_base` + original extension. Returns that path.
pub fn decrypt_file(
    input: &Path,
    output_base: &Path,
    password: SecretString,
    params: &KdfParams,
) -> Result<PathBuf, DecodeError> {
    let reader = File::open(input)?;
    let decoder = Decoder::open(reader, password, params)?;
    let restored = restored_name(output_base, decoder.extension());

    let mut tmp = temp_beside(&restored)?;
    let decoded = decoder.decrypt_to(tmp.as_file_mut())?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(&restored).map_err(|e| DecodeError::Io(e.error))?;

    info!(
        input = %input.display(),
        output = %restored.display(),
        chunks = decoded.chunks,
        bytes = decoded.bytes,
        "file decrypted"
    );
    Ok(restored)
}

fn temp_beside(path: &Path) -> io::Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    NamedTempFile::new_in(parent)
}
