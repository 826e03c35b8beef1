//! # HMAC Signing and Verification
//!
//! `sig = base64(HMAC-SHA256(secret, ts || "|" || payload))`
//!
//! ## Security Properties
//!
//! - Tag comparison is constant-time (`Mac::verify_slice`)
//! - A `sig` that is not valid base64 fails exactly like a wrong tag

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use super::canonical::{canonical_value, signed_message};
use super::entities::{Meta, Timestamp};
use super::errors::AuthError;
use super::keys::SharedSecret;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm label carried in `meta.algo`.
pub const ALGORITHM: &str = "HMAC-SHA256";

fn keyed_mac(secret: &SharedSecret) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

// =============================================================================
// Raw message level
// =============================================================================

/// Computes the base64 signature of an already assembled signed message.
pub fn compute_signature(secret: &SharedSecret, message: &[u8]) -> String {
    let mut mac = keyed_mac(secret);
    mac.update(message);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Checks `sig` against an already assembled signed message.
pub fn verify_signature(secret: &SharedSecret, message: &[u8], sig: &str) -> Result<(), AuthError> {
    let tag = BASE64.decode(sig).map_err(|_| AuthError::InvalidHmac)?;

    let mut mac = keyed_mac(secret);
    mac.update(message);
    mac.verify_slice(&tag).map_err(|_| AuthError::InvalidHmac)
}

// =============================================================================
// Envelope level
// =============================================================================

/// Verifies `meta.sig` over `ts` and the canonical form of `data`.
///
/// This is the single authentication check: succeeds silently on a match,
/// fails with [`AuthError::InvalidHmac`] otherwise. `algo` and `key_id` are
/// not consulted here; see `MessageAuthenticator` for those.
pub fn verify(secret: &SharedSecret, meta: &Meta, data: &Value) -> Result<(), AuthError> {
    let payload = canonical_value(data)?;
    verify_payload(secret, meta, &payload)
}

/// Verifies `meta.sig` over `ts` and payload bytes taken as-is.
pub fn verify_payload(secret: &SharedSecret, meta: &Meta, payload: &[u8]) -> Result<(), AuthError> {
    let message = signed_message(&meta.ts, payload);
    verify_signature(secret, &message, &meta.sig)
}

/// Produces the metadata the exchange attaches to an outgoing payload.
pub fn sign(
    secret: &SharedSecret,
    key_id: Option<&str>,
    ts: Timestamp,
    data: &Value,
) -> Result<Meta, AuthError> {
    let payload = canonical_value(data)?;
    let sig = compute_signature(secret, &signed_message(&ts, &payload));
    Ok(Meta {
        ts,
        sig,
        algo: Some(ALGORITHM.to_string()),
        key_id: key_id.map(str::to_string),
        extra: Map::new(),
    })
}
