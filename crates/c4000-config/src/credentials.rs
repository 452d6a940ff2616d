// ── Credential resolution ──
//
// First complete username/password pair wins: environment, creds file,
// keyring, plaintext config. Prompting is the caller's last resort.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tracing::debug;

use crate::{Config, ConfigError};

/// Default creds file, looked up relative to the working directory.
pub const DEFAULT_CREDS_FILE: &str = "c4000_control.creds";

/// Keyring service name; the keyring user is the modem username.
pub const KEYRING_SERVICE: &str = "c4000";

const ENV_USERNAME: &str = "C4000_USERNAME";
const ENV_PASSWORD: &str = "C4000_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    CredsFile(PathBuf),
    Keyring,
    ConfigFile,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "environment variables"),
            Self::CredsFile(path) => write!(f, "{}", path.display()),
            Self::Keyring => write!(f, "system keyring"),
            Self::ConfigFile => write!(f, "config file"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub username: String,
    pub password: SecretString,
    pub source: CredentialSource,
}

/// Parse a `KEY=VALUE` creds file body into upper-cased keys.
///
/// Blank lines, `#` comments, and lines without `=` are ignored.
pub fn parse_creds_file(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_ascii_uppercase(), value.trim().to_owned()))
        .collect()
}

fn complete_pair(username: Option<String>, password: Option<String>) -> Option<(String, String)> {
    match (username, password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
        _ => None,
    }
}

fn from_env() -> Option<(String, String)> {
    complete_pair(std::env::var(ENV_USERNAME).ok(), std::env::var(ENV_PASSWORD).ok())
}

fn from_creds_file(path: &Path) -> Result<Option<(String, String)>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    debug!("reading credentials from {}", path.display());
    let mut creds = parse_creds_file(&std::fs::read_to_string(path)?);
    Ok(complete_pair(creds.remove("USERNAME"), creds.remove("PASSWORD")))
}

fn from_keyring(username: &str) -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, username).ok()?;
    entry.get_password().ok().filter(|pw| !pw.is_empty())
}

/// Walk the credential chain. `Ok(None)` means nothing was configured and
/// the caller should prompt.
pub fn resolve_credentials(
    config: &Config,
    creds_file: &Path,
) -> Result<Option<ResolvedCredentials>, ConfigError> {
    let resolved = |(username, password): (String, String), source| ResolvedCredentials {
        username,
        password: SecretString::from(password),
        source,
    };

    // 1. Environment
    if let Some(pair) = from_env() {
        return Ok(Some(resolved(pair, CredentialSource::Environment)));
    }

    // 2. Creds file
    if let Some(pair) = from_creds_file(creds_file)? {
        return Ok(Some(resolved(
            pair,
            CredentialSource::CredsFile(creds_file.to_path_buf()),
        )));
    }

    let Some(username) = config.username.clone().filter(|u| !u.is_empty()) else {
        return Ok(None);
    };

    // 3. Keyring
    if let Some(password) = from_keyring(&username) {
        return Ok(Some(resolved((username, password), CredentialSource::Keyring)));
    }

    // 4. Plaintext in config
    Ok(complete_pair(Some(username), config.password.clone())
        .map(|pair| resolved(pair, CredentialSource::ConfigFile)))
}

/// Store `password` for `username` in the system keyring.
pub fn store_password(username: &str, password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, username)
        .and_then(|entry| entry.set_password(password))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}
