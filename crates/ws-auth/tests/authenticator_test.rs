//! # Authenticator Tests
//!
//! Attempts to get a forged or altered envelope past the authenticator.
//!
//! ## Test Categories
//!
//! 1. **Golden Vectors** - Signatures produced by the exchange's signer
//! 2. **Round-Trip** - Sign then verify, for arbitrary payloads
//! 3. **Tampering** - Altered payload bytes, timestamps, signatures
//! 4. **Key Handling** - Wrong key, rotated keys
//! 5. **Serialization Sensitivity** - Member order, whitespace

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use ws_auth::{
    canonical_value, compute_signature, sign, signed_message, verify, verify_payload, AuthError,
    CanonicalForm, Envelope, KeyRing, Meta, MessageAuthenticator, MessageAuthenticatorApi,
    SharedSecret, StaticSecret, Timestamp,
};

// =============================================================================
// TEST HELPERS
// =============================================================================

const DEMO_SECRET: &[u8] = b"phoenyra_demo_secret";

fn demo_secret() -> SharedSecret {
    SharedSecret::new(DEMO_SECRET.to_vec())
}

fn demo_authenticator() -> MessageAuthenticator<StaticSecret> {
    MessageAuthenticator::new(StaticSecret::from_bytes(DEMO_SECRET.to_vec()))
}

fn frame(meta: &Meta, data: &Value) -> String {
    serde_json::to_string(&Envelope {
        meta: meta.clone(),
        data: data.clone(),
    })
    .unwrap()
}

const BASE64_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

// =============================================================================
// 1. GOLDEN VECTORS
// =============================================================================

#[test]
fn golden_order_ack() {
    let payload = canonical_value(&json!({"type": "order_ack"})).unwrap();
    let message = signed_message(&Timestamp::Numeric(1700000000), &payload);
    assert_eq!(message, br#"1700000000|{"type":"order_ack"}"#.to_vec());
    assert_eq!(
        compute_signature(&demo_secret(), &message),
        "oV0HVHp0MnsP4rG8ae/ZtrIwOUIWRNChBsDXA8eGHNY="
    );
}

#[test]
fn golden_order_ack_truncated_sig() {
    let meta = Meta::new(1700000000u64, "oV0HVHp0MnsP4rG8ae/ZtrIwOUIWRNChBsDXA8eGHNY");
    assert_eq!(
        demo_authenticator().verify(&meta, &json!({"type": "order_ack"})),
        Err(AuthError::InvalidHmac)
    );
}

#[test]
fn golden_exchange_frame_with_non_ascii_payload() {
    // As sent by the exchange: default separators on the wire, string ts,
    // unsigned extras in meta.
    let frame = r#"{"meta": {"ts": "1700000000123", "sig": "o1WncbKnsSA5QPDpo97kdepXttBMnp/r+cSoVw3IgC8=", "algo": "HMAC-SHA256", "key_id": "default", "throttle_remaining": 118}, "data": {"type": "trade", "market": "epex_at", "price": 101.5, "qty": 2, "note": "Grüße"}}"#;
    let msg = demo_authenticator().verify_frame(frame).unwrap();
    assert_eq!(msg.msg_type(), Some("trade"));
    assert_eq!(msg.meta.extra.get("throttle_remaining"), Some(&json!(118)));
}

#[test]
fn golden_exchange_frame_with_exponent_floats() {
    let frame = r#"{"meta": {"ts": "1700000000123", "sig": "ZWG4YT2PsRG2rukY1+jEQeleUnXsMt6jjE74o1Lh3/Y="}, "data": {"type": "book", "bids": [[99.5, 1e-05]], "asks": [[1e+16, 2.0]]}}"#;
    assert!(demo_authenticator().verify_frame(frame).is_ok());
}

#[test]
fn golden_integers_wider_than_64_bits() {
    let frame = r#"{"meta": {"ts": 1700000000, "sig": "vZvEuJbnSCnMrWfDTUxx38W8yOPXsxgQWgFFYNp8JtQ="}, "data": {"type": "order_ack", "id": 18446744073709551616, "neg": -0, "big": -123456789012345678901234567890}}"#;
    let msg = demo_authenticator().verify_frame(frame).unwrap();
    assert_eq!(msg.data["id"].to_string(), "18446744073709551616");
}

#[test]
fn golden_rotated_key() {
    let ring = KeyRing::from_entries([
        ("2024-06".to_string(), SharedSecret::new(b"rotated_key_2".to_vec())),
        ("default".to_string(), demo_secret()),
    ])
    .unwrap();
    let auth = MessageAuthenticator::new(ring);

    let mut meta = Meta::new(1700000000u64, "3AFAyis0vnXj2fQoXmXKYcXlrOtkADoY0KfY4nw5jbA=");
    // No key id: the active key signed it.
    assert_eq!(auth.verify(&meta, &json!({"type": "order_ack"})), Ok(()));

    // Still verifiable under the previous key while it is in the ring.
    meta.sig = "oV0HVHp0MnsP4rG8ae/ZtrIwOUIWRNChBsDXA8eGHNY=".into();
    meta.key_id = Some("default".into());
    assert_eq!(auth.verify(&meta, &json!({"type": "order_ack"})), Ok(()));

    // Old signature presented as the new key.
    meta.key_id = Some("2024-06".into());
    assert_eq!(
        auth.verify(&meta, &json!({"type": "order_ack"})),
        Err(AuthError::InvalidHmac)
    );
}

// =============================================================================
// 5. SERIALIZATION SENSITIVITY
// =============================================================================

#[test]
fn member_order_changes_signature() {
    let ab: Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
    let ba: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
    assert_eq!(ab, ba, "semantically equal");

    let meta_ab = sign(&demo_secret(), None, 1u64.into(), &ab).unwrap();
    let meta_ba = sign(&demo_secret(), None, 1u64.into(), &ba).unwrap();
    assert_ne!(meta_ab.sig, meta_ba.sig);

    assert_eq!(verify(&demo_secret(), &meta_ab, &ab), Ok(()));
    assert_eq!(verify(&demo_secret(), &meta_ab, &ba), Err(AuthError::InvalidHmac));
}

#[test]
fn whitespace_changes_signature_in_verbatim_form() {
    let secret = demo_secret();
    let compact = r#"{"type":"order_ack"}"#;
    let spaced = r#"{"type": "order_ack"}"#;
    let meta = Meta::new(
        7u64,
        compute_signature(&secret, &signed_message(&7u64.into(), compact.as_bytes())),
    );

    assert_eq!(verify_payload(&secret, &meta, compact.as_bytes()), Ok(()));
    assert_eq!(
        verify_payload(&secret, &meta, spaced.as_bytes()),
        Err(AuthError::InvalidHmac)
    );

    let verbatim = MessageAuthenticator::with_form(StaticSecret::new(secret), CanonicalForm::Verbatim);
    let good = format!(r#"{{"meta":{},"data":{}}}"#, serde_json::to_string(&meta).unwrap(), compact);
    let bad = format!(r#"{{"meta":{},"data":{}}}"#, serde_json::to_string(&meta).unwrap(), spaced);
    assert!(verbatim.verify_frame(&good).is_ok());
    assert!(verbatim.verify_frame(&bad).is_err());
}

// =============================================================================
// PROPERTIES (2, 3, 4)
// =============================================================================

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::from),
        any::<String>().prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((any::<String>(), inner), 0..6)
                .prop_map(|members| Value::Object(members.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    prop_oneof![
        any::<u64>().prop_map(Timestamp::Numeric),
        "[0-9]{1,19}".prop_map(Timestamp::Text),
    ]
}

fn arb_secret() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..80)
}

proptest! {
    #[test]
    fn prop_sign_then_verify(secret in arb_secret(), ts in arb_timestamp(), data in arb_json()) {
        let secret = SharedSecret::new(secret);
        let meta = sign(&secret, None, ts, &data).unwrap();
        prop_assert_eq!(verify(&secret, &meta, &data), Ok(()));
    }

    #[test]
    fn prop_sign_then_verify_frame(ts in arb_timestamp(), data in arb_json()) {
        let meta = sign(&demo_secret(), Some("default"), ts, &data).unwrap();
        let auth = demo_authenticator();
        let msg = auth.verify_frame(&frame(&meta, &data));
        prop_assert!(msg.is_ok(), "{:?}", msg);
    }

    #[test]
    fn prop_payload_byte_tamper_detected(
        ts in arb_timestamp(),
        data in arb_json(),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let secret = demo_secret();
        let meta = sign(&secret, None, ts, &data).unwrap();
        let mut payload = canonical_value(&data).unwrap();
        let i = index.index(payload.len());
        payload[i] ^= flip;
        prop_assert_eq!(verify_payload(&secret, &meta, &payload), Err(AuthError::InvalidHmac));
    }

    #[test]
    fn prop_timestamp_tamper_detected(ts in any::<u64>(), other in any::<u64>(), data in arb_json()) {
        prop_assume!(ts != other);
        let secret = demo_secret();
        let mut meta = sign(&secret, None, Timestamp::Numeric(ts), &data).unwrap();
        meta.ts = Timestamp::Numeric(other);
        prop_assert_eq!(verify(&secret, &meta, &data), Err(AuthError::InvalidHmac));
    }

    #[test]
    fn prop_sig_tamper_detected(
        data in arb_json(),
        index in any::<prop::sample::Index>(),
        replacement in any::<prop::sample::Index>(),
    ) {
        let secret = demo_secret();
        let mut meta = sign(&secret, None, 1700000000u64.into(), &data).unwrap();
        let mut sig = meta.sig.into_bytes();
        let i = index.index(sig.len());
        let mut c = BASE64_ALPHABET[replacement.index(BASE64_ALPHABET.len())];
        if c == sig[i] {
            c = if c == b'A' { b'B' } else { b'A' };
        }
        sig[i] = c;
        meta.sig = String::from_utf8(sig).unwrap();
        prop_assert_eq!(verify(&secret, &meta, &data), Err(AuthError::InvalidHmac));
    }

    #[test]
    fn prop_wrong_key_rejected(
        a in prop::array::uniform32(any::<u8>()),
        b in prop::array::uniform32(any::<u8>()),
        data in arb_json(),
    ) {
        // Fixed length: HMAC zero-pads short keys, so "k" and "k\0" are one key.
        prop_assume!(a != b);
        let meta = sign(&SharedSecret::new(a.to_vec()), None, 1u64.into(), &data).unwrap();
        prop_assert_eq!(
            verify(&SharedSecret::new(b.to_vec()), &meta, &data),
            Err(AuthError::InvalidHmac)
        );
    }
}
