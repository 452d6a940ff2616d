//! Shared configuration for the `c4000` CLI.
//!
//! TOML file + `C4000_` environment layering via figment, credential
//! resolution (env, creds file, keyring, plaintext), and default modem
//! address discovery. Interactive prompting stays in the binary.

mod credentials;
mod gateway;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use credentials::{
    CredentialSource, DEFAULT_CREDS_FILE, KEYRING_SERVICE, ResolvedCredentials, parse_creds_file,
    resolve_credentials, store_password,
};
pub use gateway::{FALLBACK_MODEM_ADDR, default_modem_addr, parse_default_gateway};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("username and password cannot be empty")]
    NoCredentials,

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Effective configuration: defaults, then `config.toml`, then `C4000_*`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Modem address. Unset means "use the default gateway".
    pub modem: Option<String>,

    /// Minimum seconds between requests.
    #[serde(default = "default_min_interval")]
    pub min_interval: f64,

    /// Seconds to wait after every write for the firmware commit.
    #[serde(default = "default_post_write_delay")]
    pub post_write_delay: f64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    pub username: Option<String>,

    /// Plaintext password (prefer the keyring).
    pub password: Option<String>,

    #[serde(default = "default_creds_file")]
    pub creds_file: PathBuf,

    /// Accept the modem's self-signed certificate.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Verify against this CA instead. Ignored when `insecure` is set.
    pub ca_cert: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modem: None,
            min_interval: default_min_interval(),
            post_write_delay: default_post_write_delay(),
            timeout: default_timeout(),
            username: None,
            password: None,
            creds_file: default_creds_file(),
            insecure: default_insecure(),
            ca_cert: None,
        }
    }
}

fn default_min_interval() -> f64 {
    2.0
}
fn default_post_write_delay() -> f64 {
    7.0
}
fn default_timeout() -> u64 {
    30
}
fn default_creds_file() -> PathBuf {
    PathBuf::from(DEFAULT_CREDS_FILE)
}
fn default_insecure() -> bool {
    true
}

impl Config {
    /// Reject values the transport cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("min_interval", self.min_interval),
            ("post_write_delay", self.post_write_delay),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: format!("expected a non-negative number of seconds, got {value}"),
                });
            }
        }
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(())
    }

    /// A copy safe to print: the plaintext password is masked.
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| "********".into()),
            ..self.clone()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "c4000", "c4000").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("c4000");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("C4000_").only(&[
            "modem",
            "min_interval",
            "post_write_delay",
            "timeout",
            "creds_file",
            "insecure",
            "ca_cert",
        ]))
        .extract()?;
    config.validate()?;
    Ok(config)
}
