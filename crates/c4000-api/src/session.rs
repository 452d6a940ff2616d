// Authenticated session against the modem's CGI endpoints.
//
// Three primitives: `login` (cgi_action), `fetch_object` (cgi_get) and
// `apply_change` (cgi_set). Each request carries the Referer of the admin
// page that would issue it in the vendor UI; the firmware behaves
// differently without it.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, ORIGIN};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::Error;
use crate::models::ObjectsResponse;
use crate::transport::{RateLimitedTransport, RequestParams, TransportConfig};

/// Cookie set by `cgi_action` on a successful login.
pub const SESSION_COOKIE: &str = "Session-Id";

const LOGIN_REFERER: &str = "login.html";
const READ_REFERER: &str = "index.html";
const WRITE_REFERER: &str = "configuring_applysettings.html";

/// Admin credentials for the modem.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Modem root, e.g. `https://192.168.0.1`. CGI paths are joined onto it.
    pub base_url: Url,
    pub transport: TransportConfig,
    /// Pause after every write; the firmware commits configuration
    /// asynchronously and the next request would race the commit.
    pub post_write_delay: Duration,
}

impl SessionConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            transport: TransportConfig::default(),
            post_write_delay: Duration::from_secs(7),
        }
    }

    /// Build the base URL for a bare host or IP (`https://{host}`).
    pub fn for_host(host: &str) -> Result<Self, Error> {
        Ok(Self::new(Url::parse(&format!("https://{host}"))?))
    }
}

/// Process-scoped modem session.
///
/// Owns the cookie jar and, through the transport, the rate-limit clock.
/// Both live exactly as long as this value.
pub struct SessionClient {
    transport: RateLimitedTransport,
    base_url: Url,
    origin: String,
    cookie_jar: Arc<Jar>,
    credentials: Credentials,
    post_write_delay: Duration,
}

impl SessionClient {
    /// Create a client. No request is sent until [`login`](Self::login).
    pub fn new(config: SessionConfig, credentials: Credentials) -> Result<Self, Error> {
        let transport_config = if config.transport.cookie_jar.is_some() {
            config.transport.clone()
        } else {
            config.transport.clone().with_cookie_jar()
        };
        let cookie_jar = transport_config
            .cookie_jar
            .clone()
            .unwrap_or_else(|| Arc::new(Jar::default()));

        let origin = config.base_url.origin().ascii_serialization();
        let http = transport_config.build_client(browser_headers(&origin)?)?;
        let transport = RateLimitedTransport::new(
            http,
            transport_config.min_interval,
            transport_config.retry,
        );

        Ok(Self {
            transport,
            base_url: config.base_url,
            origin,
            cookie_jar,
            credentials,
            post_write_delay: config.post_write_delay,
        })
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn cgi_url(&self, endpoint: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("cgi/{endpoint}"))?)
    }

    fn referer(&self, page: &str) -> String {
        format!("{}/{page}", self.origin)
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Log in, reporting the outcome as a typed error.
    ///
    /// Success is recognised only by the session cookie landing in the jar;
    /// the modem answers 200 to bad credentials too.
    pub async fn try_login(&self) -> Result<(), Error> {
        let url = self.cgi_url("cgi_action")?;
        debug!("logging in at {url}");

        self.transport.reset_clock().await;
        let form = [
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.expose_secret()),
        ];
        self.transport
            .send(
                &Method::POST,
                &url,
                &self.referer(LOGIN_REFERER),
                RequestParams::Form(&form),
            )
            .await?;

        if self.has_session_cookie(&url) {
            debug!("session cookie granted");
            Ok(())
        } else {
            Err(Error::Authentication {
                message: format!("no {SESSION_COOKIE} cookie in login response"),
            })
        }
    }

    /// Log in. Returns `false` on bad credentials or an unreachable modem.
    pub async fn login(&self) -> bool {
        info!("logging in as {}", self.credentials.username);
        match self.try_login().await {
            Ok(()) => {
                info!("login successful");
                true
            }
            Err(Error::Authentication { message }) => {
                warn!("login failed, check credentials: {message}");
                false
            }
            Err(e) => {
                error!("error connecting to modem: {e}");
                false
            }
        }
    }

    fn has_session_cookie(&self, url: &Url) -> bool {
        let Some(header) = self.cookie_jar.cookies(url) else {
            return false;
        };
        header.to_str().is_ok_and(|cookies| {
            cookies
                .split(';')
                .filter_map(|pair| pair.split_once('='))
                .any(|(name, _)| name.trim() == SESSION_COOKIE)
        })
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Read an object subtree via `cgi_get?Object={object_path}`.
    ///
    /// An empty, `null`, or non-object body is `Error::InvalidResponse`,
    /// never an empty result: the firmware sometimes answers with a
    /// syntactically valid nothing, and that must not read as "no rules".
    pub async fn fetch_object(&self, object_path: &str) -> Result<serde_json::Value, Error> {
        let url = self.cgi_url("cgi_get")?;
        debug!("sending GET for object {object_path}");

        let query = [("Object", object_path)];
        let body = self
            .transport
            .send(
                &Method::GET,
                &url,
                &self.referer(READ_REFERER),
                RequestParams::Query(&query),
            )
            .await?;

        let invalid = |message: String| Error::InvalidResponse {
            object: object_path.to_owned(),
            message,
        };

        if body.trim().is_empty() {
            return Err(invalid("empty body".into()));
        }
        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            let preview = body.chars().take(200).collect::<String>();
            debug!("failed to parse JSON from {object_path}: {e} (body preview: {preview:?})");
            invalid(e.to_string())
        })?;

        match value {
            serde_json::Value::Null => Err(invalid("modem returned null".into())),
            serde_json::Value::Object(_) => Ok(value),
            other => Err(invalid(format!("expected a JSON object, got {other}"))),
        }
    }

    /// [`fetch_object`](Self::fetch_object) parsed into the `Objects` envelope.
    pub async fn fetch_objects(&self, object_path: &str) -> Result<ObjectsResponse, Error> {
        let value = self.fetch_object(object_path).await?;
        ObjectsResponse::from_value(value).map_err(|e| Error::InvalidResponse {
            object: object_path.to_owned(),
            message: e.to_string(),
        })
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Send a `cgi_set` write, then wait out the firmware commit.
    ///
    /// Never retried. The post-write pause is taken whether or not the
    /// write reported success, since a failed POST may still be committing.
    pub async fn apply_change(&self, payload: &[(&str, &str)]) -> Result<(), Error> {
        let url = self.cgi_url("cgi_set")?;
        debug!("sending SET with payload {payload:?}");

        let result = self
            .transport
            .send(
                &Method::POST,
                &url,
                &self.referer(WRITE_REFERER),
                RequestParams::Form(payload),
            )
            .await;

        if !self.post_write_delay.is_zero() {
            debug!(
                "write safety: pausing {:.1}s for firmware commit",
                self.post_write_delay.as_secs_f64()
            );
            tokio::time::sleep(self.post_write_delay).await;
        }

        result.map(drop)
    }
}

fn browser_headers(origin: &str) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    Ok(headers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> SessionClient {
        SessionClient::new(
            SessionConfig::new(Url::parse(base).unwrap()),
            Credentials {
                username: "admin".into(),
                password: SecretString::from("secret".to_string()),
            },
        )
        .unwrap()
    }

    #[test]
    fn cgi_urls_are_joined_on_the_root() {
        let c = client("https://192.168.0.1");
        assert_eq!(
            c.cgi_url("cgi_get").unwrap().as_str(),
            "https://192.168.0.1/cgi/cgi_get"
        );
    }

    #[test]
    fn referer_uses_origin() {
        let c = client("https://192.168.0.1");
        assert_eq!(c.referer(WRITE_REFERER), "https://192.168.0.1/configuring_applysettings.html");
    }

    #[test]
    fn for_host_builds_https_root() {
        let config = SessionConfig::for_host("10.0.0.1").unwrap();
        assert_eq!(config.base_url.as_str(), "https://10.0.0.1/");
        assert_eq!(config.post_write_delay, Duration::from_secs(7));
    }

    #[test]
    fn no_cookie_before_login() {
        let c = client("https://192.168.0.1");
        let url = c.cgi_url("cgi_action").unwrap();
        assert!(!c.has_session_cookie(&url));
    }
}
