//! # Authentication Errors
//!
//! Error types for envelope authentication and key handling.

use thiserror::Error;

/// Outcome of a failed authentication check.
///
/// `InvalidHmac` is the only failure the signature comparison itself can
/// produce. The remaining variants reject an envelope before any MAC is
/// computed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Recomputed signature does not match `meta.sig`.
    #[error("Invalid HMAC")]
    InvalidHmac,

    /// `meta.key_id` names a key this verifier does not hold.
    #[error("Unknown signing key: {0}")]
    UnknownKeyId(String),

    /// `meta.algo` names something other than HMAC-SHA256.
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The payload could not be brought into its signed byte form.
    #[error("Payload serialization failed: {0}")]
    Serialization(String),
}

/// Errors raised while loading or decoding key material.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    /// A key ring needs at least one entry.
    #[error("Key ring is empty")]
    EmptyKeyRing,

    /// Secrets must not be empty.
    #[error("Empty secret for key {0}")]
    EmptySecret(String),

    /// The same key id appeared twice.
    #[error("Duplicate key id: {0}")]
    DuplicateKeyId(String),

    /// `HMAC_KEYS_JSON` is not a list of `{kid, secret}` objects.
    #[error("Malformed key list: {0}")]
    MalformedKeyList(String),
}

/// Errors raised while handling a raw text frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The frame is not a well-formed envelope.
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    /// The envelope parsed but failed authentication.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl FrameError {
    /// Returns the authentication failure, if this is one.
    pub fn as_auth(&self) -> Option<&AuthError> {
        match self {
            FrameError::Auth(e) => Some(e),
            FrameError::Malformed(_) => None,
        }
    }
}
