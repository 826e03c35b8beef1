//! # Client Configuration
//!
//! Defaults, overridden by environment variables, overridden by CLI flags.
//!
//! | Variable          | Default               |
//! |-------------------|-----------------------|
//! | `EXCHANGE_WS_URL` | `ws://localhost:9000`   |
//! | `EXCHANGE_URL`    | `http://localhost:9000` |
//! | `API_KEY`         | `demo`                  |
//!
//! Key material (`HMAC_SECRET`, `HMAC_KEYS_JSON`) is loaded separately by
//! `ws_auth::load_key_ring`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;
use url::Url;
use ws_auth::{CanonicalForm, KeyRing, SharedSecret, DEMO_SECRET};

use crate::handler::FailurePolicy;

/// Default WebSocket base of the exchange.
pub const DEFAULT_WS_URL: &str = "ws://localhost:9000";

/// Default HTTP base of the exchange (key discovery).
pub const DEFAULT_HTTP_URL: &str = "http://localhost:9000";

/// Default API key passed in the query string.
pub const DEFAULT_API_KEY: &str = "demo";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme {0}, expected ws or wss")]
    UnsupportedScheme(String),

    #[error("No HMAC keys configured")]
    EmptyKeyRing,
}

// =============================================================================
// Streams
// =============================================================================

/// A stream offered by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stream {
    /// Order lifecycle events for the API key's account.
    #[default]
    Orders,
    /// Public trade prints.
    Trades,
    /// Order book snapshots for one market.
    Book(String),
}

impl Stream {
    /// Path below the WebSocket base, e.g. `ws/book/epex_at`.
    pub fn path(&self) -> String {
        match self {
            Stream::Orders => "ws/orders".to_string(),
            Stream::Trades => "ws/trades".to_string(),
            Stream::Book(market) => format!("ws/book/{market}"),
        }
    }
}

impl FromStr for Stream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orders" => Ok(Stream::Orders),
            "trades" => Ok(Stream::Trades),
            other => match other.strip_prefix("book/").or_else(|| other.strip_prefix("book:")) {
                Some(market) if !market.is_empty() && !market.contains('/') => {
                    Ok(Stream::Book(market.to_string()))
                }
                _ => Err(format!(
                    "unknown stream {other:?}, expected orders, trades or book/<market>"
                )),
            },
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Orders => f.write_str("orders"),
            Stream::Trades => f.write_str("trades"),
            Stream::Book(market) => write!(f, "book/{market}"),
        }
    }
}

// =============================================================================
// Client configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket base URL.
    pub ws_url: String,
    /// HTTP base URL, for `/.well-known/ws-keys`.
    pub http_url: String,
    /// API key sent as `?api_key=`.
    pub api_key: String,
    /// Stream to subscribe to.
    pub stream: Stream,
    /// Canonicalization rule shared with the signer.
    pub form: CanonicalForm,
    /// What to do with a message that fails authentication.
    pub policy: FailurePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            http_url: DEFAULT_HTTP_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            stream: Stream::default(),
            form: CanonicalForm::default(),
            policy: FailurePolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults with environment overrides applied through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("EXCHANGE_WS_URL") {
            config.ws_url = url;
        }
        if let Some(url) = lookup("EXCHANGE_URL") {
            config.http_url = url;
        }
        if let Some(key) = lookup("API_KEY") {
            config.api_key = key;
        }

        config
    }

    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Full subscription URL: `<ws_url>/<stream path>?api_key=<key>`.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidUrl {
            url: self.ws_url.clone(),
            reason,
        };

        let mut base = Url::parse(&self.ws_url).map_err(|e| invalid(e.to_string()))?;
        match base.scheme() {
            "ws" | "wss" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        // `join` replaces the last segment unless the base ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut url = base
            .join(&self.stream.path())
            .map_err(|e| invalid(e.to_string()))?;
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url)
    }

    /// Checks the key material. The WebSocket endpoint is only checked by
    /// [`endpoint`](Self::endpoint), so offline commands work with any `ws_url`.
    pub fn validate(&self, ring: &KeyRing) -> Result<(), ConfigError> {
        if ring.is_empty() {
            return Err(ConfigError::EmptyKeyRing);
        }
        warn_on_demo_secret(ring);
        Ok(())
    }

    /// The endpoint with the API key masked, for logs.
    pub fn redacted_endpoint(&self) -> Result<Url, ConfigError> {
        let mut url = self.endpoint()?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "api_key" { "***".to_string() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        Ok(url)
    }
}

/// Warns when the active key is the well-known demo secret.
///
/// Returns `true` if the warning was emitted.
pub fn warn_on_demo_secret(ring: &KeyRing) -> bool {
    let demo = SharedSecret::new(DEMO_SECRET.as_bytes()).fingerprint();
    let active = ring
        .get(ring.active_kid())
        .map(SharedSecret::fingerprint);
    if active.as_deref() == Some(demo.as_str()) {
        warn!(
            key_id = ring.active_kid(),
            "Using the demo HMAC secret. Set HMAC_SECRET or HMAC_KEYS_JSON for real deployments."
        );
        return true;
    }
    false
}
