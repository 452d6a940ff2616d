// ── Core error types ──
//
// Every variant is distinguishable without inspecting message text. The
// reconciler only ever needs one question answered: is this a device
// hiccup worth another attempt (`is_device_error`), or something else?

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Device errors (retryable within a reconciliation attempt) ────
    #[error("Modem communication failed: {message}")]
    Transport { message: String },

    #[error("Invalid response from modem: {message}")]
    InvalidResponse { message: String },

    // ── Session ──────────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Resolution / reconciliation ──────────────────────────────────
    #[error("Could not find any device matching '{identifier}'")]
    ResolutionNotFound { identifier: String },

    #[error("Could not {action} rule '{domain}' for {target} after {attempts} attempts")]
    ReconciliationExhausted {
        action: String,
        domain: String,
        target: String,
        attempts: u32,
    },

    #[error("Could not verify removal of rule #{id} after {attempts} attempts")]
    RemovalUnverified { id: String, attempts: u32 },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Failures produced by the modem mid-session. A reconciliation
    /// attempt that hits one of these backs off and tries again.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::InvalidResponse { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<c4000_api::Error> for CoreError {
    fn from(err: c4000_api::Error) -> Self {
        match err {
            c4000_api::Error::Transport { .. } => CoreError::Transport {
                message: err.to_string(),
            },
            c4000_api::Error::InvalidResponse { object, message } => CoreError::InvalidResponse {
                message: format!("{object}: {message}"),
            },
            c4000_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            c4000_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            c4000_api::Error::InvalidHeader(e) => CoreError::Config {
                message: format!("Invalid header value: {e}"),
            },
            c4000_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
        }
    }
}
