// Rate-limited HTTP transport for the modem's CGI endpoints.
//
// Every request to the modem goes through `RateLimitedTransport`: it owns
// the `reqwest::Client`, the minimum-interval clock, and the per-method
// retry budget. Nothing else in the workspace talks to the device directly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Method;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (the modem ships a self-signed one).
    #[default]
    DangerAcceptInvalid,
}

/// Attempt budget per request kind.
///
/// Reads are idempotent and get `read_attempts` tries with linear backoff.
/// Writes get exactly one: a POST that timed out may still have been applied
/// by the firmware, and replaying it can create a second rule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub read_attempts: u32,
    /// Backoff before retry `n` is `backoff_step * n`.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            read_attempts: 3,
            backoff_step: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Total attempts allowed for `method`. Only GET is ever retried.
    pub fn attempts_for(&self, method: &Method) -> u32 {
        if *method == Method::GET {
            self.read_attempts.max(1)
        } else {
            1
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

/// Shared transport configuration for building the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
    /// Minimum wall-clock gap between the end of one request and the start
    /// of the next.
    pub min_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(30),
            cookie_jar: None,
            min_interval: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

/// Desktop Chrome. The admin UI refuses or misbehaves for unknown agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

impl TransportConfig {
    /// Build a `reqwest::Client` with the given default headers.
    pub fn build_client(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Create a config with a fresh cookie jar (for session auth).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}

// ── Rate limiter ─────────────────────────────────────────────────────

/// Minimum-interval limiter.
///
/// Uses `tokio::time::Instant`, so tests can pause and advance the clock.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time still to wait before the next request may start.
    pub fn remaining(&self) -> Duration {
        self.last_request.map_or(Duration::ZERO, |last| {
            self.min_interval.saturating_sub(last.elapsed())
        })
    }

    /// Sleep until `min_interval` has passed since the last completed request.
    pub async fn wait(&self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            debug!("rate limit: sleeping {:.2}s", remaining.as_secs_f64());
            sleep(remaining).await;
        }
    }

    /// Record that a request just completed, successfully or not.
    pub fn mark(&mut self) {
        self.last_request = Some(Instant::now());
    }

    /// Forget the last request so the next one starts immediately.
    pub fn reset(&mut self) {
        self.last_request = None;
    }
}

// ── Transport ────────────────────────────────────────────────────────

/// Parameters attached to a single request.
#[derive(Debug, Clone, Copy)]
pub enum RequestParams<'a> {
    None,
    /// URL query string (reads).
    Query(&'a [(&'a str, &'a str)]),
    /// `application/x-www-form-urlencoded` body (writes).
    Form(&'a [(&'a str, &'a str)]),
}

/// The only path to the modem.
///
/// The limiter sits behind an async mutex that is held for the whole
/// request including retries, so callers sharing a transport serialize on
/// the same budget.
pub struct RateLimitedTransport {
    http: reqwest::Client,
    limiter: Mutex<RateLimiter>,
    retry: RetryPolicy,
}

impl RateLimitedTransport {
    pub fn new(http: reqwest::Client, min_interval: Duration, retry: RetryPolicy) -> Self {
        Self {
            http,
            limiter: Mutex::new(RateLimiter::new(min_interval)),
            retry,
        }
    }

    /// Reset the rate-limit clock (used before login).
    pub async fn reset_clock(&self) {
        self.limiter.lock().await.reset();
    }

    /// Send a request and return the response body.
    ///
    /// Non-2xx statuses count as failed attempts, same as network errors.
    /// The body is read inside the attempt so a truncated read is retried
    /// like any other transport failure.
    pub async fn send(
        &self,
        method: &Method,
        url: &Url,
        referer: &str,
        params: RequestParams<'_>,
    ) -> Result<String, Error> {
        let referer = HeaderValue::from_str(referer)?;
        let attempts = self.retry.attempts_for(method);
        let mut limiter = self.limiter.lock().await;

        let mut attempt = 1;
        loop {
            limiter.wait().await;
            trace!(%method, %url, attempt, "dispatching");

            let result = self.attempt(method, url, &referer, params).await;
            limiter.mark();

            match result {
                Ok(body) => return Ok(body),
                Err(source) => {
                    debug!("request failed (attempt {attempt}/{attempts}): {source}");
                    if attempt >= attempts {
                        return Err(Error::Transport {
                            method: method.to_string(),
                            url: url.to_string(),
                            attempts,
                            source,
                        });
                    }
                    let backoff = self.retry.backoff(attempt);
                    debug!("backing off for {:.1}s before retry", backoff.as_secs_f64());
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        referer: &HeaderValue,
        params: RequestParams<'_>,
    ) -> Result<String, reqwest::Error> {
        let builder = self
            .http
            .request(method.clone(), url.clone())
            .header(REFERER, referer.clone());
        let builder = match params {
            RequestParams::None => builder,
            RequestParams::Query(query) => builder.query(query),
            RequestParams::Form(form) => builder.form(form),
        };

        builder.send().await?.error_for_status()?.text().await
    }
}
