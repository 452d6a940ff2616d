//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use c4000_config::ConfigError;
use c4000_core::CoreError;

/// Process exit codes. Success is 0.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to modem at {modem}")]
    #[diagnostic(
        code(c4000::connection_failed),
        help(
            "Check that the modem is reachable and the address is right.\n\
             Pass it explicitly with --modem, or set C4000_MODEM."
        )
    )]
    ConnectionFailed {
        modem: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Modem communication failed: {message}")]
    #[diagnostic(
        code(c4000::transport),
        help("The modem may be busy. Try again with a larger --delay.")
    )]
    Transport { message: String },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(c4000::tls_error),
        help("Check ca_cert in your config, or set insecure = true for the modem's self-signed certificate.")
    )]
    TlsError { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login to {modem} failed")]
    #[diagnostic(
        code(c4000::auth_failed),
        help(
            "The modem did not grant a session. Verify your credentials:\n\
             C4000_USERNAME / C4000_PASSWORD, the creds file, or\n\
             Run: c4000 config set-password"
        )
    )]
    AuthFailed { modem: String },

    #[error("Username and password cannot be empty")]
    #[diagnostic(
        code(c4000::no_credentials),
        help(
            "Set C4000_USERNAME and C4000_PASSWORD, create c4000_control.creds\n\
             with USERNAME= and PASSWORD= lines, or run interactively to be prompted."
        )
    )]
    NoCredentials,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(c4000::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Modem ────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(c4000::modem))]
    Modem { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(c4000::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(c4000::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(c4000::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(c4000::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(c4000::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Transport { .. } | Self::TlsError { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::NoCredentials => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Config(inner) => match inner.as_ref() {
                ConfigError::NoCredentials => exit_code::AUTH,
                ConfigError::Validation { .. } => exit_code::USAGE,
                _ => exit_code::GENERAL,
            },
            _ => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials => Self::NoCredentials,
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message } => CliError::Transport { message },

            CoreError::AuthenticationFailed { message: _ } => CliError::AuthFailed {
                modem: "modem".into(),
            },

            CoreError::ResolutionNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                hint: "Run: c4000 device list to see known devices".into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },

            other @ (CoreError::InvalidResponse { .. }
            | CoreError::ReconciliationExhausted { .. }
            | CoreError::RemovalUnverified { .. }) => CliError::Modem {
                message: other.to_string(),
            },
        }
    }
}
