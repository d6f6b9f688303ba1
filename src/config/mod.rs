//! Configuration management

mod credentials;

pub use credentials::{read_secret_file, run_secret_command};

use crate::crypto::{CipherAlgo, CompressionAlgo, DigestAlgo, EncryptionSettings, DEFAULT_ITERATIONS};
use crate::remote::WebDavOptions;
use crate::scanner::check_local_base;
use crate::types::{DeleteMode, SyncError};
use clap::{ArgAction, Parser};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Encrypt a local directory tree and push it to a WebDAV share
#[derive(Parser, Debug)]
#[command(name = "sealsync", version, about, long_about = None)]
pub struct Cli {
    /// Local directory to synchronize
    pub local_dir: PathBuf,

    /// Remote base: an http(s):// WebDAV URL or a local directory
    pub remote_dir: String,

    /// WebDAV user name
    #[arg(short = 'u', long)]
    pub webdav_user: Option<String>,

    /// WebDAV password
    #[arg(short = 'p', long)]
    pub webdav_password: Option<String>,

    /// Read the WebDAV password from a file
    #[arg(long, value_name = "FILE")]
    pub webdav_password_file: Option<PathBuf>,

    /// Read the WebDAV password from the output of a shell command
    #[arg(long, value_name = "COMMAND")]
    pub webdav_password_command: Option<String>,

    /// Encryption passphrase
    #[arg(long)]
    pub passphrase: Option<String>,

    /// Read the encryption passphrase from a file
    #[arg(long, value_name = "FILE")]
    pub passphrase_file: Option<PathBuf>,

    /// Read the encryption passphrase from the output of a shell command
    #[arg(long, value_name = "COMMAND")]
    pub passphrase_command: Option<String>,

    /// Cipher for the encrypted artifacts
    #[arg(long, value_enum, ignore_case = true, default_value_t = CipherAlgo::Aes256)]
    pub cipher_algo: CipherAlgo,

    /// Digest used to derive the key from the passphrase
    #[arg(long, value_enum, ignore_case = true, default_value_t = DigestAlgo::Sha256)]
    pub digest_algo: DigestAlgo,

    /// Compress file contents before encryption
    #[arg(long, value_enum, ignore_case = true, default_value_t = CompressionAlgo::None)]
    pub compress_algo: CompressionAlgo,

    /// Compression level (0-9)
    #[arg(short = 'z', long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub compress_level: u8,

    /// Exclude paths matching a glob pattern (can be repeated)
    #[arg(short = 'e', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Upload every file, even if unchanged
    #[arg(long)]
    pub force: bool,

    /// Download and decrypt the remote tree into LOCAL_DIR instead of uploading
    #[arg(long, conflicts_with_all = ["delete", "delete_excluded"])]
    pub restore: bool,

    /// Remove remote entries that no longer exist locally
    #[arg(long)]
    pub delete: bool,

    /// With --delete, also remove remote entries matching an exclude pattern
    #[arg(long)]
    pub delete_excluded: bool,

    /// Don't verify the server's TLS certificate
    #[arg(long)]
    pub no_check_certificate: bool,

    /// Network timeout in seconds
    #[arg(short = 't', long, default_value_t = 10)]
    pub timeout: u64,

    /// Upload the manifest after every N uploaded files
    #[arg(long, value_name = "N", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub save_metadata_step: u64,

    /// Show a progress spinner on the terminal
    #[arg(long)]
    pub progress: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

/// Validated configuration for one run
#[derive(Clone)]
pub struct Config {
    /// Local directory to read from
    pub local_base: PathBuf,

    /// Remote base (WebDAV URL or local directory)
    pub remote_base: String,

    /// Connection settings for the WebDAV adapter
    pub webdav: WebDavOptions,

    /// Symmetric encryption passphrase
    pub passphrase: String,

    pub encryption: EncryptionSettings,

    /// Exclude patterns (globs)
    pub exclude: Vec<String>,

    /// Upload unconditionally; on restore, overwrite existing local files
    pub force: bool,

    /// Pull the remote tree back instead of pushing
    pub restore: bool,

    /// How to handle remote orphans
    pub delete_mode: DeleteMode,

    /// Checkpoint the manifest every N uploads (at least 1)
    pub save_metadata_step: usize,

    pub progress: bool,

    pub verbose: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_base: PathBuf::new(),
            remote_base: String::new(),
            webdav: WebDavOptions::default(),
            passphrase: String::new(),
            encryption: EncryptionSettings::default(),
            exclude: Vec::new(),
            force: false,
            restore: false,
            delete_mode: DeleteMode::None,
            save_metadata_step: 10,
            progress: false,
            verbose: 0,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("local_base", &self.local_base)
            .field("remote_base", &self.remote_base)
            .field("webdav_user", &self.webdav.user)
            .field("encryption", &self.encryption)
            .field("exclude", &self.exclude)
            .field("force", &self.force)
            .field("restore", &self.restore)
            .field("delete_mode", &self.delete_mode)
            .field("save_metadata_step", &self.save_metadata_step)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), SyncError> {
        check_local_base(&self.local_base)?;

        if self.remote_base.trim().is_empty() {
            return Err(SyncError::Config("Remote directory must not be empty".to_string()));
        }

        if self.passphrase.is_empty() {
            return Err(SyncError::Config(
                "An encryption passphrase is required (--passphrase, --passphrase-file or --passphrase-command)"
                    .to_string(),
            ));
        }

        if self.save_metadata_step == 0 {
            return Err(SyncError::Config(
                "--save-metadata-step must be at least 1".to_string(),
            ));
        }

        if self.encryption.compression_level > 9 {
            return Err(SyncError::Config(format!(
                "Compression level must be between 0 and 9, got {}",
                self.encryption.compression_level
            )));
        }

        Ok(())
    }
}

/// Pick a secret from its three possible sources.
///
/// A file or command wins over the literal value; their output is trimmed.
fn resolve_secret(
    literal: Option<String>,
    file: Option<&PathBuf>,
    command: Option<&str>,
) -> Result<Option<String>, SyncError> {
    if let Some(command) = command {
        return run_secret_command(command).map(Some);
    }
    if let Some(file) = file {
        return read_secret_file(file).map(Some);
    }
    Ok(literal)
}

impl TryFrom<Cli> for Config {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.delete_excluded && !cli.delete {
            warn!("--delete-excluded has no effect without --delete");
        }

        let passphrase = resolve_secret(
            cli.passphrase,
            cli.passphrase_file.as_ref(),
            cli.passphrase_command.as_deref(),
        )?
        .unwrap_or_default();

        let password = resolve_secret(
            cli.webdav_password,
            cli.webdav_password_file.as_ref(),
            cli.webdav_password_command.as_deref(),
        )?;

        let mut config = Config {
            local_base: cli.local_dir,
            remote_base: cli.remote_dir,
            webdav: WebDavOptions {
                user: cli.webdav_user,
                password,
                timeout: Duration::from_secs(cli.timeout),
                verify_certificate: !cli.no_check_certificate,
            },
            passphrase,
            encryption: EncryptionSettings {
                cipher: cli.cipher_algo,
                digest: cli.digest_algo,
                compression: cli.compress_algo,
                compression_level: cli.compress_level,
                iterations: DEFAULT_ITERATIONS,
            },
            exclude: cli.exclude,
            force: cli.force,
            restore: cli.restore,
            delete_mode: DeleteMode::from_flags(cli.delete, cli.delete_excluded),
            save_metadata_step: usize::try_from(cli.save_metadata_step).unwrap_or(usize::MAX),
            progress: cli.progress,
            verbose: cli.verbose,
        };

        config.validate()?;

        // Only ask once everything else is known to be usable
        if let (Some(user), None) = (&config.webdav.user, &config.webdav.password) {
            if is_webdav_url(&config.remote_base) {
                let prompt = format!("WebDAV password for {user}: ");
                config.webdav.password = Some(rpassword::prompt_password(prompt)?);
            }
        }
        Ok(config)
    }
}

fn is_webdav_url(remote: &str) -> bool {
    remote.starts_with("http://") || remote.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["sealsync"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&["/src", "https://dav.example.org/backup"]);
        assert_eq!(cli.cipher_algo, CipherAlgo::Aes256);
        assert_eq!(cli.digest_algo, DigestAlgo::Sha256);
        assert_eq!(cli.compress_algo, CompressionAlgo::None);
        assert_eq!(cli.compress_level, 6);
        assert_eq!(cli.timeout, 10);
        assert_eq!(cli.save_metadata_step, 10);
        assert_eq!(cli.verbose, 0);
        assert!(cli.exclude.is_empty());
    }

    #[test]
    fn test_cli_algorithm_names_are_case_insensitive() {
        let cli = parse(&["/src", "/dst", "--cipher-algo", "AES", "--digest-algo", "SHA512"]);
        assert_eq!(cli.cipher_algo, CipherAlgo::Aes128);
        assert_eq!(cli.digest_algo, DigestAlgo::Sha512);

        let cli = parse(&["/src", "/dst", "--cipher-algo", "CHACHA20", "--compress-algo", "zlib"]);
        assert_eq!(cli.cipher_algo, CipherAlgo::ChaCha20);
        assert_eq!(cli.compress_algo, CompressionAlgo::Zlib);
    }

    #[test]
    fn test_cli_rejects_out_of_range_values() {
        assert!(Cli::try_parse_from(["sealsync", "/s", "/d", "-z", "10"]).is_err());
        assert!(Cli::try_parse_from(["sealsync", "/s", "/d", "--save-metadata-step", "0"]).is_err());
        assert!(Cli::try_parse_from(["sealsync", "/s", "/d", "--cipher-algo", "des"]).is_err());
    }

    #[test]
    fn test_repeated_excludes_and_verbosity() {
        let cli = parse(&["/src", "/dst", "-e", "*.tmp", "--exclude", "cache", "-vv"]);
        assert_eq!(cli.exclude, vec!["*.tmp", "cache"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_try_from_builds_config() {
        let local = TempDir::new().unwrap();
        let local_arg = local.path().to_str().unwrap();
        let cli = parse(&[
            local_arg,
            "https://dav.example.org/backup",
            "-u",
            "alice",
            "-p",
            "secret",
            "--passphrase",
            "correct horse",
            "--delete",
            "--no-check-certificate",
            "-t",
            "30",
        ]);

        let config = Config::try_from(cli).unwrap();
        assert_eq!(config.passphrase, "correct horse");
        assert_eq!(config.webdav.user.as_deref(), Some("alice"));
        assert_eq!(config.webdav.password.as_deref(), Some("secret"));
        assert_eq!(config.webdav.timeout, Duration::from_secs(30));
        assert!(!config.webdav.verify_certificate);
        assert_eq!(config.delete_mode, DeleteMode::Orphans);
        assert_eq!(config.save_metadata_step, 10);
    }

    #[test]
    fn test_delete_excluded_requires_delete() {
        let local = TempDir::new().unwrap();
        let local_arg = local.path().to_str().unwrap();

        let cli = parse(&[local_arg, "/dst", "--passphrase", "x", "--delete-excluded"]);
        assert_eq!(Config::try_from(cli).unwrap().delete_mode, DeleteMode::None);

        let cli = parse(&[local_arg, "/dst", "--passphrase", "x", "--delete", "--delete-excluded"]);
        assert_eq!(
            Config::try_from(cli).unwrap().delete_mode,
            DeleteMode::OrphansAndExcluded
        );
    }

    #[test]
    fn test_passphrase_file_wins_over_literal() {
        let local = TempDir::new().unwrap();
        let secret = local.path().join("secret.txt");
        std::fs::write(&secret, "from-file\n").unwrap();

        let cli = parse(&[
            local.path().to_str().unwrap(),
            "/dst",
            "--passphrase",
            "literal",
            "--passphrase-file",
            secret.to_str().unwrap(),
        ]);
        assert_eq!(Config::try_from(cli).unwrap().passphrase, "from-file");
    }

    #[cfg(unix)]
    #[test]
    fn test_passphrase_command_output_is_trimmed() {
        let local = TempDir::new().unwrap();
        let cli = parse(&[
            local.path().to_str().unwrap(),
            "/dst",
            "--passphrase-command",
            "echo '  from command  '",
        ]);
        assert_eq!(Config::try_from(cli).unwrap().passphrase, "from command");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_password_command_is_error() {
        let local = TempDir::new().unwrap();
        let cli = parse(&[
            local.path().to_str().unwrap(),
            "https://dav.example.org/",
            "--passphrase",
            "x",
            "--webdav-password-command",
            "exit 3",
        ]);
        let err = Config::try_from(cli).unwrap_err();
        assert!(matches!(err, SyncError::CredentialCommand { .. }));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_missing_passphrase_is_config_error() {
        let local = TempDir::new().unwrap();
        let cli = parse(&[local.path().to_str().unwrap(), "/dst"]);
        assert!(Config::try_from(cli).unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_missing_local_dir_is_config_error() {
        let local = TempDir::new().unwrap();
        let missing = local.path().join("nope");
        let cli = parse(&[missing.to_str().unwrap(), "/dst", "--passphrase", "x"]);
        let err = Config::try_from(cli).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("doesn't exist"));
    }

    #[test]
    fn test_invalid_config_fails_before_password_prompt() {
        let local = TempDir::new().unwrap();
        let missing = local.path().join("nope");
        let cli = parse(&[missing.to_str().unwrap(), "https://dav.example.org/", "-u", "alice"]);
        let err = Config::try_from(cli).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("doesn't exist"));

        let cli = parse(&[local.path().to_str().unwrap(), "https://dav.example.org/", "-u", "alice"]);
        let err = Config::try_from(cli).unwrap_err();
        assert!(err.to_string().contains("passphrase"));
    }

    #[test]
    fn test_restore_flag() {
        let local = TempDir::new().unwrap();
        let local_arg = local.path().to_str().unwrap();
        let cli = parse(&[local_arg, "/dst", "--passphrase", "x", "--restore", "--force"]);
        let config = Config::try_from(cli).unwrap();
        assert!(config.restore);
        assert!(config.force);
        assert_eq!(config.delete_mode, DeleteMode::None);

        let argv = ["sealsync", local_arg, "/dst", "--restore", "--delete"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_default_config_fails_validation() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let config = Config {
            passphrase: "hunter2".to_string(),
            webdav: WebDavOptions {
                password: Some("pa55".to_string()),
                ..WebDavOptions::default()
            },
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("pa55"));
    }
}
