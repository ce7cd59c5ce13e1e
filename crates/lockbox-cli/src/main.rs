//! lockbox: password-based file encryption CLI
//!
//! Commands:
//!   encrypt <input> [-o <output>]       - seal a file into a .enc container
//!   decrypt <input> [-o <output-base>]  - restore a file, extension included
//!   history [--recent N]                - show the operation log
//!   history clear                       - empty the operation log
//!   config show                         - display current configuration
//!
//! The password is read from LOCKBOX_PASSWORD when set, otherwise prompted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lockbox_core::config::LockboxConfig;
use lockbox_core::{Engine, FileHistory, HistoryStore, LockboxError};

const PASSWORD_ENV: &str = "LOCKBOX_PASSWORD";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "lockbox",
    version,
    about = "Password-based file encryption",
    long_about = "lockbox: encrypt files into Argon2id + AES-256-GCM containers and restore them"
)]
struct Cli {
    /// Path to lockbox.toml configuration file
    #[arg(long, short = 'c', env = "LOCKBOX_CONFIG", default_value = "lockbox.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOCKBOX_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file into a password-protected container
    Encrypt {
        /// File to encrypt
        input: PathBuf,
        /// Container path (default: <input>.enc)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Decrypt a container, restoring the original file extension
    Decrypt {
        /// Container to decrypt
        input: PathBuf,
        /// Output path without extension; the stored extension is appended
        /// (default: container name minus ".enc" and the original extension)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show or clear the operation history
    History {
        /// Only show the last N entries (default from config when flag has no value)
        #[arg(long, num_args = 0..=1, default_missing_value = "0")]
        recent: Option<usize>,

        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// Remove all history entries
    Clear,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let config = LockboxConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;
    let history: Arc<dyn HistoryStore> = Arc::new(FileHistory::new(config.history_path()));
    tracing::debug!(
        config = %cli.config.display(),
        history = %config.history_path().display(),
        "configuration loaded"
    );

    match cli.command {
        Commands::Encrypt { input, output } => {
            cmd_encrypt(&Engine::new(history), &input, output.as_deref())
        }
        Commands::Decrypt { input, output } => {
            cmd_decrypt(&Engine::new(history), &input, output.as_deref())
        }
        Commands::History {
            action: Some(HistoryAction::Clear),
            ..
        } => cmd_history_clear(history.as_ref()),
        Commands::History {
            recent,
            action: None,
        } => cmd_history_show(&config, history.as_ref(), recent),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

// ── Password input ────────────────────────────────────────────────────────────

fn read_password(confirm: bool) -> Result<SecretString> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    let password = SecretString::from(
        rpassword::prompt_password("Password: ").context("reading password")?,
    );
    if password.expose_secret().is_empty() {
        anyhow::bail!("password must not be empty");
    }

    if confirm {
        let again = SecretString::from(
            rpassword::prompt_password("Confirm password: ").context("reading password")?,
        );
        if again.expose_secret() != password.expose_secret() {
            anyhow::bail!("passwords do not match");
        }
    }

    Ok(password)
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

/// Coarse progress: the codec reports nothing between start and finish.
fn make_progress_bar(prefix: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(100);
    let template = "{prefix:.bold} {spinner} [{bar:40.cyan/blue}] {percent:>3}% {msg}";
    pb.set_style(
        ProgressStyle::with_template(template)
            .context("progress bar template")?
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

// ── `lockbox encrypt` ─────────────────────────────────────────────────────────

fn cmd_encrypt(engine: &Engine, input: &Path, output: Option<&Path>) -> Result<()> {
    if !input.is_file() {
        anyhow::bail!("not a file: {}", input.display());
    }
    let password = read_password(true)?;

    let pb = make_progress_bar("encrypt")?;
    pb.set_message(input.display().to_string());

    match engine.encrypt(input, output, password) {
        Ok(path) => {
            pb.set_position(100);
            pb.finish_with_message("done");
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            println!("  input:   {}", input.display());
            println!("  output:  {}", path.display());
            println!("  size:    {}", fmt_bytes(size));
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("failed");
            Err(e).with_context(|| format!("encrypting {}", input.display()))
        }
    }
}

// ── `lockbox decrypt` ─────────────────────────────────────────────────────────

fn cmd_decrypt(engine: &Engine, input: &Path, output: Option<&Path>) -> Result<()> {
    if !input.is_file() {
        anyhow::bail!("not a file: {}", input.display());
    }
    let password = read_password(false)?;

    let pb = make_progress_bar("decrypt")?;
    pb.set_message(input.display().to_string());

    match engine.decrypt(input, output, password) {
        Ok(path) => {
            pb.set_position(100);
            pb.finish_with_message("done");
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            println!("  input:   {}", input.display());
            println!("  output:  {}", path.display());
            println!("  size:    {}", fmt_bytes(size));
            Ok(())
        }
        Err(e) if e.is_bad_container() => {
            pb.abandon_with_message("failed");
            anyhow::bail!(
                "decryption failed, incorrect password or corrupted file: {}",
                input.display()
            )
        }
        Err(e) => {
            pb.abandon_with_message("failed");
            Err::<(), LockboxError>(e).with_context(|| format!("decrypting {}", input.display()))
        }
    }
}

// ── `lockbox history` ─────────────────────────────────────────────────────────

fn cmd_history_show(
    config: &LockboxConfig,
    history: &dyn HistoryStore,
    recent: Option<usize>,
) -> Result<()> {
    let text = match recent {
        None => history.read_all(),
        Some(0) => history.read_recent(config.history.recent_lines),
        Some(n) => history.read_recent(n),
    }
    .context("reading history")?;

    println!("{}", text.trim_end());
    Ok(())
}

fn cmd_history_clear(history: &dyn HistoryStore) -> Result<()> {
    history.clear().context("clearing history")?;
    println!("History cleared.");
    Ok(())
}

// ── `lockbox config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &LockboxConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_history_recent_forms() {
        let cli = Cli::try_parse_from(["lockbox", "history", "--recent", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                recent: Some(5),
                action: None
            }
        ));

        let cli = Cli::try_parse_from(["lockbox", "history", "--recent"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                recent: Some(0),
                ..
            }
        ));

        let cli = Cli::try_parse_from(["lockbox", "history", "clear"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                action: Some(HistoryAction::Clear),
                ..
            }
        ));
    }

    #[test]
    fn parses_decrypt_output() {
        let cli = Cli::try_parse_from(["lockbox", "decrypt", "a.pdf.enc", "-o", "out/a"]).unwrap();
        match cli.command {
            Commands::Decrypt { input, output } => {
                assert_eq!(input, PathBuf::from("a.pdf.enc"));
                assert_eq!(output, Some(PathBuf::from("out/a")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn fmt_bytes_units() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KB");
        assert_eq!(fmt_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
