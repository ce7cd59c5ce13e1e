use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LockboxError, LockboxResult};

/// Top-level configuration (loaded from lockbox.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LockboxConfig {
    pub daemon: DaemonConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// HTTP listen address (default: 127.0.0.1:5000)
    pub listen: String,
    /// Directory for uploaded files and their encrypted/decrypted results
    pub upload_dir: PathBuf,
    /// Largest accepted upload in MiB
    pub max_upload_mb: u64,
    /// Serve Prometheus metrics on /metrics (default: true)
    pub metrics: bool,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Append-only operation log
    pub path: PathBuf,
    /// Lines shown by `history --recent` when no count is given
    pub recent_lines: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:5000".into(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_mb: 512,
            metrics: true,
            log_level: "info".into(),
            log_format: "text".into(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("encryption_history.log"),
            recent_lines: 20,
        }
    }
}

impl LockboxConfig {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> LockboxResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| LockboxError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn history_path(&self) -> PathBuf {
        expand_tilde(&self.history.path)
    }

    pub fn upload_dir(&self) -> PathBuf {
        expand_tilde(&self.daemon.upload_dir)
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(format!("{home}/{rest}"))
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[daemon]
listen = "0.0.0.0:8080"
upload_dir = "/var/lib/lockbox/uploads"
max_upload_mb = 64
metrics = false
log_level = "debug"
log_format = "json"

[history]
path = "/var/log/lockbox/history.log"
recent_lines = 50
"#;
        let config: LockboxConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.daemon.listen, "0.0.0.0:8080");
        assert_eq!(config.daemon.upload_dir, PathBuf::from("/var/lib/lockbox/uploads"));
        assert_eq!(config.daemon.max_upload_mb, 64);
        assert!(!config.daemon.metrics);
        assert_eq!(config.daemon.log_format, "json");
        assert_eq!(config.history.path, PathBuf::from("/var/log/lockbox/history.log"));
        assert_eq!(config.history.recent_lines, 50);
    }

    #[test]
    fn test_parse_defaults() {
        let config: LockboxConfig = toml::from_str("").unwrap();

        assert_eq!(config.daemon.listen, "127.0.0.1:5000");
        assert_eq!(config.daemon.upload_dir, PathBuf::from("uploads"));
        assert!(config.daemon.metrics);
        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.history.path, PathBuf::from("encryption_history.log"));
        assert_eq!(config.history.recent_lines, 20);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[history]
recent_lines = 5
"#;
        let config: LockboxConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.history.recent_lines, 5);
        // Defaults
        assert_eq!(config.history.path, PathBuf::from("encryption_history.log"));
        assert_eq!(config.daemon.listen, "127.0.0.1:5000");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = LockboxConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: LockboxConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.daemon.listen, parsed.daemon.listen);
        assert_eq!(config.history.path, parsed.history.path);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = LockboxConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.history.recent_lines, 20);
    }

    #[test]
    fn test_load_invalid_file_is_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("lockbox.toml");
        std::fs::write(&path, "[daemon\nlisten = 1").unwrap();

        let err = LockboxConfig::load(&path).unwrap_err();
        assert!(matches!(err, LockboxError::Config(_)));
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
        assert_eq!(expand_tilde(Path::new("rel/x")), PathBuf::from("rel/x"));
    }
}
