//! # Environment Key Loading
//!
//! Builds a `KeyRing` from the variables the exchange itself reads:
//!
//! - `HMAC_KEYS_JSON`: `[{"kid": "...", "secret": "..."}, ...]`, first entry
//!   active
//! - `HMAC_SECRET`: single secret under kid `default`, used when
//!   `HMAC_KEYS_JSON` is unset
//!
//! Secrets go through `SharedSecret::decode` (base64, hex, then UTF-8).

use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::errors::KeyError;
use crate::domain::keys::{KeyRing, SharedSecret};

/// Variable holding the rotation key list.
pub const HMAC_KEYS_JSON_VAR: &str = "HMAC_KEYS_JSON";

/// Variable holding the single fallback secret.
pub const HMAC_SECRET_VAR: &str = "HMAC_SECRET";

/// Secret the exchange falls back to when nothing is configured.
pub const DEMO_SECRET: &str = "phoenyra_demo_secret";

#[derive(Deserialize)]
struct KeyEntry {
    kid: String,
    secret: String,
}

/// Loads the key ring through an arbitrary variable lookup.
///
/// `lookup` returns `None` for unset variables. Taking a closure keeps tests
/// independent of the process environment.
pub fn load_key_ring<F>(lookup: F) -> Result<KeyRing, KeyError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(HMAC_KEYS_JSON_VAR) {
        let entries: Vec<KeyEntry> = serde_json::from_str(&raw)
            .map_err(|e| KeyError::MalformedKeyList(e.to_string()))?;
        let ring = KeyRing::from_entries(
            entries
                .into_iter()
                .map(|e| (e.kid, SharedSecret::decode(&e.secret))),
        )?;
        info!(keys = ring.len(), active = ring.active_kid(), "Loaded HMAC key ring");
        return Ok(ring);
    }

    let secret = match lookup(HMAC_SECRET_VAR) {
        Some(s) => s,
        None => {
            debug!("{} not set, using the demo secret", HMAC_SECRET_VAR);
            DEMO_SECRET.to_string()
        }
    };
    KeyRing::single(SharedSecret::decode(&secret))
}

/// Loads the key ring from the process environment.
pub fn load_key_ring_from_env() -> Result<KeyRing, KeyError> {
    load_key_ring(|name| std::env::var(name).ok())
}
