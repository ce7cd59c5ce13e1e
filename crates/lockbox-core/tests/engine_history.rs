//! Integration tests for the operation runner: files on disk, default output
//! paths, and one history line per attempt.

use std::path::Path;
use std::sync::Arc;

use lockbox_core::{Engine, FileHistory, HistoryStore, LockboxError};
use lockbox_crypto::{DecodeError, KdfParams};
use secrecy::SecretString;
use tempfile::TempDir;

fn fast_params() -> KdfParams {
    KdfParams {
        mem_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

fn engine(dir: &Path) -> (Engine, Arc<FileHistory>) {
    let history = Arc::new(FileHistory::new(dir.join("history.log")));
    let engine = Engine::with_params(history.clone(), fast_params());
    (engine, history)
}

fn pw(s: &str) -> SecretString {
    SecretString::from(s)
}

#[test]
fn encrypt_then_decrypt_with_default_paths() {
    let tmp = TempDir::new().unwrap();
    let (engine, history) = engine(tmp.path());

    let src = tmp.path().join("report.pdf");
    std::fs::write(&src, b"quarterly numbers").unwrap();

    let enc = engine.encrypt(&src, None, pw("correct-horse")).unwrap();
    assert_eq!(enc, tmp.path().join("report.pdf.enc"));

    std::fs::remove_file(&src).unwrap();
    let restored = engine.decrypt(&enc, None, pw("correct-horse")).unwrap();
    assert_eq!(restored, tmp.path().join("report.pdf"));
    assert_eq!(std::fs::read(&restored).unwrap(), b"quarterly numbers");

    let log = history.read_all().unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("] ENCRYPTION - report.pdf - SUCCESS - "));
    assert!(lines[0].ends_with("report.pdf.enc"));
    assert!(lines[1].contains("] DECRYPTION - report.pdf.enc - SUCCESS - "));
    assert!(lines[1].ends_with("report.pdf"));
}

#[test]
fn wrong_password_is_logged_and_leaves_no_file() {
    let tmp = TempDir::new().unwrap();
    let (engine, history) = engine(tmp.path());

    let src = tmp.path().join("secret.txt");
    std::fs::write(&src, vec![b'a'; 100_000]).unwrap();
    let enc = engine.encrypt(&src, None, pw("correct-horse")).unwrap();

    let out_base = tmp.path().join("out/secret");
    let err = engine
        .decrypt(&enc, Some(&out_base), pw("wrong-horse"))
        .unwrap_err();

    assert!(matches!(
        err,
        LockboxError::Decode(DecodeError::AuthenticationFailed { chunk: 0 })
    ));
    assert!(err.is_bad_container());
    assert!(!tmp.path().join("out/secret.txt").exists());

    let recent = history.read_recent(1).unwrap();
    assert!(recent.contains(
        "DECRYPTION - secret.txt.enc - FAILED - incorrect password or corrupted file"
    ));
    assert!(recent.trim_end().ends_with("out/secret"));
}

#[test]
fn failed_encrypt_is_logged() {
    let tmp = TempDir::new().unwrap();
    let (engine, history) = engine(tmp.path());

    let missing = tmp.path().join("missing.doc");
    let err = engine.encrypt(&missing, None, pw("pw")).unwrap_err();
    assert!(matches!(err, LockboxError::Encode(_)));

    let log = history.read_all().unwrap();
    assert!(log.contains("ENCRYPTION - missing.doc - FAILED - "));
}

#[test]
fn truncated_container_is_reported_as_corrupted() {
    let tmp = TempDir::new().unwrap();
    let (engine, _history) = engine(tmp.path());

    let enc = tmp.path().join("short.enc");
    std::fs::write(&enc, [2u8; 20]).unwrap();

    let err = engine.decrypt(&enc, None, pw("pw")).unwrap_err();
    assert!(matches!(err, LockboxError::Decode(DecodeError::Truncated)));
    assert!(err.is_bad_container());
}

#[test]
fn explicit_output_paths_are_used() {
    let tmp = TempDir::new().unwrap();
    let (engine, _history) = engine(tmp.path());

    let src = tmp.path().join("photo.jpeg");
    std::fs::write(&src, b"\xFF\xD8\xFF").unwrap();

    let enc_path = tmp.path().join("vault/blob");
    let enc = engine.encrypt(&src, Some(&enc_path), pw("pw")).unwrap();
    assert_eq!(enc, enc_path);

    let restored = engine
        .decrypt(&enc, Some(&tmp.path().join("back/photo_copy")), pw("pw"))
        .unwrap();
    assert_eq!(restored, tmp.path().join("back/photo_copy.jpeg"));
}
