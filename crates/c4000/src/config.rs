//! CLI configuration: file + env via `c4000-config`, overridden by flags.
//!
//! Also owns the pieces that need a terminal: the credential prompt and
//! the login step that turns a config into a live `SessionClient`.

use std::io::IsTerminal;
use std::time::Duration;

use c4000_api::{Credentials, SessionClient, SessionConfig, TlsMode};
use c4000_config::{Config, ResolvedCredentials};
use dialoguer::Input;
use secrecy::SecretString;
use tracing::{debug, info};
use url::Url;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use c4000_config::config_path;

/// Load the config file and apply CLI flag overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = c4000_config::load_config()?;

    if let Some(ref modem) = global.modem {
        cfg.modem = Some(modem.clone());
    }
    if let Some(delay) = global.delay {
        cfg.min_interval = delay;
    }
    if let Some(delay) = global.post_write_delay {
        cfg.post_write_delay = delay;
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    if let Some(ref path) = global.creds_file {
        cfg.creds_file.clone_from(path);
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Configured modem address, falling back to the default gateway.
pub fn modem_addr(cfg: &Config) -> String {
    cfg.modem
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(c4000_config::default_modem_addr)
}

/// Translate config into session settings for `modem`.
///
/// A bare host becomes `https://{host}`; a full URL is taken as-is.
pub fn session_config(cfg: &Config, modem: &str) -> Result<SessionConfig, CliError> {
    let invalid = |reason: String| CliError::Validation {
        field: "modem".into(),
        reason,
    };
    let mut session = if modem.contains("://") {
        SessionConfig::new(Url::parse(modem).map_err(|e| invalid(format!("{modem}: {e}")))?)
    } else {
        SessionConfig::for_host(modem).map_err(|e| invalid(format!("{modem}: {e}")))?
    };

    session.transport.tls = if cfg.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca) = cfg.ca_cert {
        TlsMode::CustomCa(ca.clone())
    } else {
        TlsMode::System
    };
    session.transport.timeout = Duration::from_secs(cfg.timeout);
    session.transport.min_interval = Duration::from_secs_f64(cfg.min_interval);
    session.post_write_delay = Duration::from_secs_f64(cfg.post_write_delay);
    Ok(session)
}

// ── Credentials ─────────────────────────────────────────────────────

/// Resolve credentials through the chain, prompting as a last resort.
pub fn credentials(cfg: &Config) -> Result<Credentials, CliError> {
    if let Some(ResolvedCredentials {
        username,
        password,
        source,
    }) = c4000_config::resolve_credentials(cfg, &cfg.creds_file)?
    {
        info!("using credentials from {source}");
        return Ok(Credentials { username, password });
    }

    if !std::io::stdin().is_terminal() {
        return Err(CliError::NoCredentials);
    }
    info!("no credentials found in environment, creds file, or keyring");
    let (username, password) = prompt_credentials(cfg.username.as_deref())?;
    Ok(Credentials {
        username,
        password: SecretString::from(password),
    })
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Prompt for username and password; neither may be empty.
pub fn prompt_credentials(username: Option<&str>) -> Result<(String, String), CliError> {
    let user = match username {
        Some(u) if !u.is_empty() => u.to_owned(),
        _ => Input::<String>::new()
            .with_prompt("Modem admin username")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_err)?,
    };
    let pass = rpassword::prompt_password("Modem admin password: ").map_err(prompt_err)?;

    if user.trim().is_empty() || pass.is_empty() {
        return Err(CliError::NoCredentials);
    }
    Ok((user.trim().to_owned(), pass))
}

// ── Session ─────────────────────────────────────────────────────────

/// Build a session against the configured modem and log in.
pub async fn connect(global: &GlobalOpts) -> Result<SessionClient, CliError> {
    let cfg = load(global)?;
    let modem = modem_addr(&cfg);
    let session_cfg = session_config(&cfg, &modem)?;
    debug!(modem = %session_cfg.base_url, "connecting");

    let credentials = credentials(&cfg)?;
    let session = SessionClient::new(session_cfg, credentials).map_err(|e| match e {
        c4000_api::Error::Tls(reason) => CliError::TlsError { reason },
        other => CliError::Validation {
            field: "modem".into(),
            reason: other.to_string(),
        },
    })?;

    info!("logging in to {modem}");
    match session.try_login().await {
        Ok(()) => {
            info!("login successful");
            Ok(session)
        }
        Err(c4000_api::Error::Authentication { .. }) => Err(CliError::AuthFailed { modem }),
        Err(e) => Err(CliError::ConnectionFailed {
            modem,
            source: Box::new(e),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_becomes_https_root() {
        let cfg = Config::default();
        let session = session_config(&cfg, "192.168.0.1").unwrap();
        assert_eq!(session.base_url.as_str(), "https://192.168.0.1/");
        assert_eq!(session.post_write_delay, Duration::from_secs(7));
        assert_eq!(session.transport.min_interval, Duration::from_secs(2));
        assert!(matches!(session.transport.tls, TlsMode::DangerAcceptInvalid));
    }

    #[test]
    fn full_url_is_kept() {
        let cfg = Config {
            insecure: false,
            min_interval: 0.5,
            ..Config::default()
        };
        let session = session_config(&cfg, "http://127.0.0.1:8080").unwrap();
        assert_eq!(session.base_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(session.transport.min_interval, Duration::from_millis(500));
        assert!(matches!(session.transport.tls, TlsMode::System));
    }

    #[test]
    fn explicit_modem_wins_over_gateway() {
        let cfg = Config {
            modem: Some("10.1.1.1".into()),
            ..Config::default()
        };
        assert_eq!(modem_addr(&cfg), "10.1.1.1");
    }
}
