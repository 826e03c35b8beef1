//! # Message Authenticator Service
//!
//! Application service layer that implements the `MessageAuthenticatorApi`
//! trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`MessageAuthenticatorApi`)
//! - Uses the outbound port (`SecretProvider`) for key material
//! - Delegates canonicalization and the MAC check to the domain layer

use serde_json::Value;
use tracing::trace;

use crate::domain::canonical::CanonicalForm;
use crate::domain::entities::{Envelope, Meta, RawEnvelope, VerifiedMessage};
use crate::domain::errors::{AuthError, FrameError};
use crate::domain::keys::SharedSecret;
use crate::domain::signing::{self, ALGORITHM};
use crate::ports::inbound::MessageAuthenticatorApi;
use crate::ports::outbound::SecretProvider;

/// Message Authenticator.
///
/// Holds the injected secret provider and the canonicalization rule shared
/// with the signer. Verification never mutates state.
pub struct MessageAuthenticator<P: SecretProvider> {
    secrets: P,
    form: CanonicalForm,
}

impl<P: SecretProvider> MessageAuthenticator<P> {
    /// Create an authenticator using the compact canonical form.
    pub fn new(secrets: P) -> Self {
        Self::with_form(secrets, CanonicalForm::default())
    }

    /// Create an authenticator with an explicit canonical form.
    pub fn with_form(secrets: P, form: CanonicalForm) -> Self {
        Self { secrets, form }
    }

    pub fn form(&self) -> CanonicalForm {
        self.form
    }

    pub fn secrets(&self) -> &P {
        &self.secrets
    }

    /// Checks `algo`, then resolves the key `meta` asks for.
    fn key_for(&self, meta: &Meta) -> Result<&SharedSecret, AuthError> {
        if let Some(algo) = meta.algo.as_deref() {
            if algo != ALGORITHM {
                return Err(AuthError::UnsupportedAlgorithm(algo.to_string()));
            }
        }
        let key_id = meta.key_id.as_deref();
        self.secrets.shared_secret(key_id).ok_or_else(|| {
            AuthError::UnknownKeyId(key_id.unwrap_or_default().to_string())
        })
    }

    fn verify_compact(&self, frame: &str) -> Result<VerifiedMessage, FrameError> {
        let envelope: Envelope =
            serde_json::from_str(frame).map_err(|e| FrameError::Malformed(e.to_string()))?;
        self.verify(&envelope.meta, &envelope.data)?;
        Ok(VerifiedMessage {
            meta: envelope.meta,
            data: envelope.data,
        })
    }

    fn verify_verbatim(&self, frame: &str) -> Result<VerifiedMessage, FrameError> {
        let envelope: RawEnvelope =
            serde_json::from_str(frame).map_err(|e| FrameError::Malformed(e.to_string()))?;
        let key = self.key_for(&envelope.meta)?;
        signing::verify_payload(key, &envelope.meta, envelope.data.get().as_bytes())?;

        let data: Value = serde_json::from_str(envelope.data.get())
            .map_err(|e| FrameError::Malformed(e.to_string()))?;
        Ok(VerifiedMessage {
            meta: envelope.meta,
            data,
        })
    }
}

impl<P: SecretProvider> MessageAuthenticatorApi for MessageAuthenticator<P> {
    fn verify(&self, meta: &Meta, data: &Value) -> Result<(), AuthError> {
        let key = self.key_for(meta)?;
        signing::verify(key, meta, data)
    }

    fn verify_frame(&self, frame: &str) -> Result<VerifiedMessage, FrameError> {
        let result = match self.form {
            CanonicalForm::Compact => self.verify_compact(frame),
            CanonicalForm::Verbatim => self.verify_verbatim(frame),
        };
        if let Ok(msg) = &result {
            trace!(ts = %msg.meta.ts, key_id = ?msg.meta.key_id, "Envelope authenticated");
        }
        result
    }
}
