//! # Outbound Ports (Driven Ports / SPI)
//!
//! Where shared secrets come from.

use crate::domain::keys::{KeyRing, SharedSecret};

/// Source of shared secrets for HMAC verification.
///
/// Implementations might:
/// - Hold one fixed secret
/// - Hold a key ring loaded from configuration
/// - Front a secret store
pub trait SecretProvider: Send + Sync {
    /// Returns the secret for the given key id.
    ///
    /// # Returns
    ///
    /// - `Some(secret)` if the key is known (`None` asks for the active key)
    /// - `None` if the key id is unknown (reject the message)
    fn shared_secret(&self, key_id: Option<&str>) -> Option<&SharedSecret>;
}

impl SecretProvider for KeyRing {
    fn shared_secret(&self, key_id: Option<&str>) -> Option<&SharedSecret> {
        self.resolve(key_id)
    }
}

impl<P: SecretProvider + ?Sized> SecretProvider for std::sync::Arc<P> {
    fn shared_secret(&self, key_id: Option<&str>) -> Option<&SharedSecret> {
        (**self).shared_secret(key_id)
    }
}
