//! # Static Secret Provider
//!
//! One fixed secret, whatever key id the envelope names.

use crate::domain::keys::SharedSecret;
use crate::ports::outbound::SecretProvider;

/// Provider holding a single secret.
///
/// Ignores `meta.key_id`, like a receiver that was handed exactly one key
/// out of band. Use a `KeyRing` when rotation matters.
#[derive(Clone, Debug)]
pub struct StaticSecret {
    secret: SharedSecret,
}

impl StaticSecret {
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }

    /// Shorthand for tests and fixtures.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(SharedSecret::new(bytes))
    }
}

impl SecretProvider for StaticSecret {
    fn shared_secret(&self, _key_id: Option<&str>) -> Option<&SharedSecret> {
        Some(&self.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_key_id_resolves() {
        let provider = StaticSecret::from_bytes(b"s".to_vec());
        assert_eq!(provider.shared_secret(None).unwrap().as_bytes(), b"s");
        assert_eq!(provider.shared_secret(Some("k9")).unwrap().as_bytes(), b"s");
    }
}
