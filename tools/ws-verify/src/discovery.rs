//! Key discovery via the exchange's `/.well-known/ws-keys` document.
//!
//! The document lists key ids and fingerprints only, never secrets. Comparing
//! it with the local ring shows whether both sides hold the same keys without
//! exchanging any key material.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;
use ws_auth::KeyRing;

/// Path of the discovery document below the HTTP base.
pub const WELL_KNOWN_PATH: &str = ".well-known/ws-keys";

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Key discovery request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One published key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedKey {
    pub kid: String,
    #[serde(default)]
    pub alg: Option<String>,
    pub fingerprint: String,
}

/// `GET /.well-known/ws-keys` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsKeysDocument {
    pub keys: Vec<PublishedKey>,
    #[serde(default)]
    pub active: Option<String>,
}

/// HTTP client for the discovery document.
pub struct DiscoveryClient {
    http_client: reqwest::Client,
    base: Url,
}

impl DiscoveryClient {
    pub fn new(base_url: &str) -> Result<Self, DiscoveryError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http_client, base })
    }

    pub fn document_url(&self) -> Result<Url, DiscoveryError> {
        Ok(self.base.join(WELL_KNOWN_PATH)?)
    }

    /// Fetches the published key list.
    pub async fn fetch(&self) -> Result<WsKeysDocument, DiscoveryError> {
        let url = self.document_url()?;
        debug!(%url, "Fetching published keys");

        let document: WsKeysDocument = self
            .http_client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(keys = document.keys.len(), active = ?document.active, "Published keys fetched");
        Ok(document)
    }
}

// =============================================================================
// Comparison
// =============================================================================

/// How a key id compares between the local ring and the published list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    Match,
    Mismatch { local: String, remote: String },
    /// Held locally, not published.
    LocalOnly,
    /// Published, not held locally.
    RemoteOnly,
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStatus::Match => f.write_str("match"),
            KeyStatus::Mismatch { local, remote } => {
                write!(f, "MISMATCH (local {local}, remote {remote})")
            }
            KeyStatus::LocalOnly => f.write_str("local only"),
            KeyStatus::RemoteOnly => f.write_str("remote only"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyComparison {
    pub kid: String,
    pub status: KeyStatus,
}

/// Result of comparing the local ring with a discovery document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyReport {
    pub keys: Vec<KeyComparison>,
    pub local_active: String,
    pub remote_active: Option<String>,
}

impl KeyReport {
    pub fn has_mismatch(&self) -> bool {
        self.keys
            .iter()
            .any(|k| matches!(k.status, KeyStatus::Mismatch { .. }))
    }

    /// Whether the remote active key can be verified locally.
    pub fn active_verifiable(&self) -> bool {
        match &self.remote_active {
            Some(kid) => self
                .keys
                .iter()
                .any(|k| &k.kid == kid && k.status == KeyStatus::Match),
            None => true,
        }
    }
}

/// Compares local fingerprints against the published ones.
///
/// Local keys come first in ring order, then remote-only keys in document
/// order.
pub fn compare(ring: &KeyRing, document: &WsKeysDocument) -> KeyReport {
    let mut keys: Vec<KeyComparison> = ring
        .fingerprints()
        .into_iter()
        .map(|(kid, local)| {
            let status = match document.keys.iter().find(|k| k.kid == kid) {
                Some(remote) if remote.fingerprint.eq_ignore_ascii_case(&local) => KeyStatus::Match,
                Some(remote) => KeyStatus::Mismatch {
                    local,
                    remote: remote.fingerprint.clone(),
                },
                None => KeyStatus::LocalOnly,
            };
            KeyComparison { kid, status }
        })
        .collect();

    for remote in &document.keys {
        if ring.get(&remote.kid).is_none() {
            keys.push(KeyComparison {
                kid: remote.kid.clone(),
                status: KeyStatus::RemoteOnly,
            });
        }
    }

    KeyReport {
        keys,
        local_active: ring.active_kid().to_string(),
        remote_active: document.active.clone(),
    }
}
