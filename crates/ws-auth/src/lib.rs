//! # Stream Message Authentication
//!
//! Verifies the HMAC-SHA256 signature the exchange attaches to every message
//! on its WebSocket streams.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Envelope types, canonical JSON, the MAC check
//! - **Ports Layer** (`ports/`): `MessageAuthenticatorApi` in, `SecretProvider` out
//! - **Adapters** (`adapters/`): Fixed secret and environment key ring
//! - **Service Layer** (`service.rs`): Wires domain logic to ports
//!
//! ## Signed Material
//!
//! ```text
//! sig = base64( HMAC-SHA256( secret, ts || "|" || canonical_json(data) ) )
//! ```
//!
//! ## Security Notes
//!
//! - Tags are compared in constant time
//! - A failed check is a value (`Err(AuthError::InvalidHmac)`), never a panic;
//!   the caller decides whether to drop the message or stop

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::{load_key_ring, load_key_ring_from_env, StaticSecret, DEMO_SECRET};
pub use domain::canonical::{canonical_json, canonical_value, signed_message, CanonicalForm};
pub use domain::entities::{Envelope, Meta, RawEnvelope, Timestamp, VerifiedMessage};
pub use domain::errors::{AuthError, FrameError, KeyError};
pub use domain::keys::{KeyRing, SharedSecret, DEFAULT_KEY_ID};
pub use domain::signing::{compute_signature, sign, verify, verify_payload, ALGORITHM};
pub use ports::inbound::MessageAuthenticatorApi;
pub use ports::outbound::SecretProvider;
pub use service::MessageAuthenticator;
