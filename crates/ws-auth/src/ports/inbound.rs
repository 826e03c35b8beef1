//! # Inbound Ports (Driving Ports / API)
//!
//! The authentication API offered to message handlers.

use serde_json::Value;

use crate::domain::entities::{Meta, VerifiedMessage};
use crate::domain::errors::{AuthError, FrameError};

/// Primary authentication API.
///
/// Implementations are stateless per call and must be thread-safe
/// (`Send + Sync`); the only shared state is read-only key material.
pub trait MessageAuthenticatorApi: Send + Sync {
    /// Verify `meta.sig` over `meta.ts` and `data`.
    ///
    /// Succeeds silently on a match. Fails with `AuthError::InvalidHmac` on a
    /// mismatch, or earlier if `algo`/`key_id` cannot be honoured.
    fn verify(&self, meta: &Meta, data: &Value) -> Result<(), AuthError>;

    /// Parse a text frame and authenticate it.
    ///
    /// This is the entry point for the stream: one call per inbound frame.
    fn verify_frame(&self, frame: &str) -> Result<VerifiedMessage, FrameError>;
}
