//! Encrypt/decrypt operations as the front ends run them: resolve default
//! output paths, call the container codec, and record every attempt in the
//! history store.

use lockbox_crypto::{decrypt_file, encrypt_file, restored_name, KdfParams};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::LockboxResult;
use crate::history::{HistoryEvent, HistoryStore, Operation, Outcome};

/// Base name used when a container's name gives no hint of the original.
pub const DEFAULT_DECRYPT_BASE: &str = "decrypted_file";

/// Runs operations against a shared history store.
#[derive(Clone)]
pub struct Engine {
    history: Arc<dyn HistoryStore>,
    params: KdfParams,
}

impl Engine {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self::with_params(history, KdfParams::default())
    }

    /// Engine with non-default KDF parameters. Containers it writes can only
    /// be opened by an engine using the same parameters.
    pub fn with_params(history: Arc<dyn HistoryStore>, params: KdfParams) -> Self {
        Self { history, params }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Encrypt `input` to `output` (default: `<input>.enc`).
    pub fn encrypt(
        &self,
        input: &Path,
        output: Option<&Path>,
        password: SecretString,
    ) -> LockboxResult<PathBuf> {
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_encrypt_output(input));

        let result = encrypt_file(input, &output, password, &self.params);
        match &result {
            Ok(summary) => info!(
                input = %input.display(),
                output = %output.display(),
                chunks = summary.chunks,
                "encryption succeeded"
            ),
            Err(e) => warn!(input = %input.display(), error = %e, "encryption failed"),
        }

        self.record(Operation::Encryption, input, outcome_of(&result), &output);
        result?;
        Ok(output)
    }

    /// Decrypt `input`, restoring the original extension onto `output_base`
    /// (default: see [`default_decrypt_base`]). Returns the restored path.
    pub fn decrypt(
        &self,
        input: &Path,
        output_base: Option<&Path>,
        password: SecretString,
    ) -> LockboxResult<PathBuf> {
        let base = output_base
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_decrypt_base(input));

        let result = decrypt_file(input, &base, password, &self.params);
        match &result {
            Ok(restored) => {
                info!(
                    input = %input.display(),
                    output = %restored.display(),
                    "decryption succeeded"
                );
                self.record(Operation::Decryption, input, Outcome::Success, restored);
            }
            Err(e) => {
                warn!(input = %input.display(), error = %e, "decryption failed");
                self.record(Operation::Decryption, input, outcome_of(&result), &base);
            }
        }

        Ok(result?)
    }

    /// History write failures are logged, never allowed to mask the
    /// operation's own result.
    fn record(&self, operation: Operation, input: &Path, outcome: Outcome, output: &Path) {
        let event = HistoryEvent::new(
            operation,
            display_name(input),
            outcome,
            Some(output.to_path_buf()),
        );
        if let Err(e) = self.history.append(&event) {
            warn!(error = %e, "failed to record history event");
        }
    }
}

fn outcome_of<T, E: std::fmt::Display>(result: &Result<T, E>) -> Outcome {
    match result {
        Ok(_) => Outcome::Success,
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `report.pdf` → `report.pdf.enc`
pub fn default_encrypt_output(input: &Path) -> PathBuf {
    restored_name(input, ".enc")
}

/// Base path for the restored file when the caller gives none.
///
/// `dir/report.pdf.enc` → `dir/report` (restored as `dir/report.pdf`);
/// anything without an `.enc` suffix → `dir/decrypted_file`.
pub fn default_decrypt_base(input: &Path) -> PathBuf {
    let stem = input
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(".enc"))
        .filter(|n| !n.is_empty())
        .and_then(|n| Path::new(n).file_stem())
        .map(|s| s.to_os_string());

    match stem {
        Some(stem) => input.with_file_name(stem),
        None => input.with_file_name(DEFAULT_DECRYPT_BASE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_encrypt_output() {
        assert_eq!(
            default_encrypt_output(Path::new("uploads/report.pdf")),
            PathBuf::from("uploads/report.pdf.enc")
        );
    }

    #[test]
    fn test_default_decrypt_base() {
        assert_eq!(
            default_decrypt_base(Path::new("uploads/report.pdf.enc")),
            PathBuf::from("uploads/report")
        );
        assert_eq!(
            default_decrypt_base(Path::new("notes.enc")),
            PathBuf::from("notes")
        );
        assert_eq!(
            default_decrypt_base(Path::new("uploads/blob.bin")),
            PathBuf::from("uploads/decrypted_file")
        );
        assert_eq!(
            default_decrypt_base(Path::new("uploads/.enc")),
            PathBuf::from("uploads/decrypted_file")
        );
    }
}
