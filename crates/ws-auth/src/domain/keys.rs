//! # Key Material
//!
//! Shared secrets and the key ring used for rotation.
//!
//! ## Security
//!
//! - Secret bytes are zeroized on drop
//! - `Debug` never prints secret bytes; keys are identified by fingerprint

use std::collections::HashMap;
use std::fmt;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::KeyError;

/// Key id used when a single secret is configured.
pub const DEFAULT_KEY_ID: &str = "default";

/// Number of hex characters in a key fingerprint.
pub const FINGERPRINT_LEN: usize = 16;

/// Standard alphabet, padding optional, non-zero trailing bits accepted.
/// Padding is enforced by [`base64_digits`] before this engine runs.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A symmetric HMAC key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: Vec<u8>,
}

impl SharedSecret {
    /// Wraps raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Decodes a configured secret string.
    ///
    /// Tried in order: base64, hex, then the UTF-8 bytes of the string
    /// itself. Base64 is read leniently, the way the exchange reads it:
    /// characters outside the alphabet are skipped, decoding stops at the
    /// padding that completes a quantum, and trailing bits may be non-zero.
    /// So `"my_exchange_secret_2024"` is base64, while
    /// `"phoenyra_demo_secret"` (18 digits left, no padding) is used as-is.
    /// Hex may separate byte pairs with whitespace.
    pub fn decode(encoded: &str) -> Self {
        if let Some(bytes) = base64_digits(encoded).and_then(|d| LENIENT_BASE64.decode(d).ok()) {
            return Self::new(bytes);
        }
        if let Some(bytes) = hex_digits(encoded).and_then(|d| hex::decode(d).ok()) {
            return Self::new(bytes);
        }
        Self::new(encoded.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// First 16 hex characters of SHA-256 over the key bytes.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        let mut fp = hex::encode(digest);
        fp.truncate(FINGERPRINT_LEN);
        fp
    }
}

/// Base64 digits of `encoded` with everything outside the alphabet removed.
///
/// `None` when the digits do not form whole quanta and no padding closes the
/// last one.
fn base64_digits(encoded: &str) -> Option<String> {
    if !encoded.is_ascii() {
        return None;
    }
    let mut digits = String::with_capacity(encoded.len());
    let mut pads = 0;
    for c in encoded.chars() {
        if c == '=' {
            let quad = digits.len() % 4;
            if quad >= 2 {
                pads += 1;
                if quad + pads >= 4 {
                    return Some(digits);
                }
            }
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '+' || c == '/' {
            digits.push(c);
            pads = 0;
        }
    }
    (digits.len() % 4 == 0).then_some(digits)
}

/// Hex digits of `encoded`, allowing whitespace between byte pairs only.
fn hex_digits(encoded: &str) -> Option<String> {
    let is_space = |c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c');
    let mut digits = String::with_capacity(encoded.len());
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        if is_space(c) {
            continue;
        }
        let low = chars.next()?;
        if is_space(low) {
            return None;
        }
        digits.push(c);
        digits.push(low);
    }
    Some(digits)
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Set of signing keys addressed by key id, one of which is active.
#[derive(Clone, Debug)]
pub struct KeyRing {
    keys: HashMap<String, SharedSecret>,
    /// Insertion order, for stable listings.
    order: Vec<String>,
    active: String,
}

impl KeyRing {
    /// Builds a ring from `(kid, secret)` pairs; the first entry is active.
    pub fn from_entries<I>(entries: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = (String, SharedSecret)>,
    {
        let mut keys = HashMap::new();
        let mut order = Vec::new();
        for (kid, secret) in entries {
            if secret.is_empty() {
                return Err(KeyError::EmptySecret(kid));
            }
            if keys.contains_key(&kid) {
                return Err(KeyError::DuplicateKeyId(kid));
            }
            order.push(kid.clone());
            keys.insert(kid, secret);
        }
        let active = order.first().cloned().ok_or(KeyError::EmptyKeyRing)?;
        Ok(Self {
            keys,
            order,
            active,
        })
    }

    /// A ring holding one secret under [`DEFAULT_KEY_ID`].
    pub fn single(secret: SharedSecret) -> Result<Self, KeyError> {
        Self::from_entries([(DEFAULT_KEY_ID.to_string(), secret)])
    }

    /// Id of the key used when an envelope names none.
    pub fn active_kid(&self) -> &str {
        &self.active
    }

    pub fn get(&self, kid: &str) -> Option<&SharedSecret> {
        self.keys.get(kid)
    }

    /// Resolves the key for an envelope: the named key, or the active one.
    pub fn resolve(&self, kid: Option<&str>) -> Option<&SharedSecret> {
        self.keys.get(kid.unwrap_or(self.active.as_str()))
    }

    /// `(kid, fingerprint)` for every key, in configuration order.
    pub fn fingerprints(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|kid| self.keys.get(kid).map(|k| (kid.clone(), k.fingerprint())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
