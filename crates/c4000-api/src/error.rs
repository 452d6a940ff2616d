use thiserror::Error;

/// Top-level error type for the `c4000-api` crate.
///
/// The modem never tells us *why* something failed, so the taxonomy is
/// coarse: the request did not get through, the body was unusable, or the
/// login was refused. `c4000-core` maps these into reconciliation decisions.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Network failure or non-2xx status after the method's attempt budget
    /// was exhausted. The retry decision looks at the method only, never at
    /// the status code.
    #[error("{method} {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        method: String,
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// URL construction error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header value (Origin, Referer) could not be encoded.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// TLS or client builder failure.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// The modem answered, but the body was empty, `null`, or not the
    /// `{Objects: [...]}` shape. Distinct from "no objects".
    #[error("Invalid response from modem for {object}: {message}")]
    InvalidResponse { object: String, message: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The login request went through but no session cookie was granted.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },
}

impl Error {
    /// Returns `true` if the request never produced a usable HTTP exchange.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns `true` if the modem answered with an unusable body.
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, Self::InvalidResponse { .. })
    }

    /// Returns `true` for failures the modem itself produced mid-session,
    /// as opposed to local configuration mistakes.
    pub fn is_device_error(&self) -> bool {
        self.is_transport() || self.is_invalid_response()
    }
}
