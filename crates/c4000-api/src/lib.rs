// c4000-api: Rate-limited session client for the C4000 web-admin CGI endpoints

pub mod error;
pub mod models;
pub mod session;
pub mod transport;

pub use error::Error;
pub use models::{CgiObject, CgiParam, ObjectsResponse};
pub use session::{Credentials, SESSION_COOKIE, SessionClient, SessionConfig};
pub use transport::{
    BROWSER_USER_AGENT, RateLimitedTransport, RateLimiter, RequestParams, RetryPolicy, TlsMode,
    TransportConfig,
};
