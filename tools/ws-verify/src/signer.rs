//! Builds signed frames the way the exchange emits them.

use serde_json::Value;
use ws_auth::{canonical_value, sign, AuthError, KeyRing, Timestamp};

/// Signs `data` with `key_id` (the active key when `None`) and returns the
/// complete frame as one line of JSON.
///
/// `data` is embedded as its canonical bytes, so the frame verifies under
/// both `CanonicalForm::Compact` and `CanonicalForm::Verbatim`.
pub fn sign_frame(
    ring: &KeyRing,
    key_id: Option<&str>,
    ts: Timestamp,
    data: &Value,
) -> Result<String, AuthError> {
    let kid = key_id.unwrap_or_else(|| ring.active_kid());
    let secret = ring
        .get(kid)
        .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))?;

    let meta = sign(secret, Some(kid), ts, data)?;
    let meta = serde_json::to_string(&meta).map_err(|e| AuthError::Serialization(e.to_string()))?;
    let payload = String::from_utf8(canonical_value(data)?)
        .map_err(|e| AuthError::Serialization(e.to_string()))?;

    Ok(format!(r#"{{"meta":{meta},"data":{payload}}}"#))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ws_auth::{
        CanonicalForm, MessageAuthenticator, MessageAuthenticatorApi, SharedSecret,
    };

    fn ring() -> KeyRing {
        KeyRing::from_entries([
            ("2024-06".to_string(), SharedSecret::new(b"rotated_key_2".to_vec())),
            ("default".to_string(), SharedSecret::new(b"phoenyra_demo_secret".to_vec())),
        ])
        .unwrap()
    }

    fn assert_verifies_both_forms(frame: &str, data: &Value) {
        for form in [CanonicalForm::Compact, CanonicalForm::Verbatim] {
            let msg = MessageAuthenticator::with_form(ring(), form)
                .verify_frame(frame)
                .unwrap_or_else(|e| panic!("{form:?}: {e}"));
            assert_eq!(&msg.data, data);
        }
    }

    #[test]
    fn test_non_ascii_payload_verifies_both_forms() {
        let data = json!({"type": "trade", "note": "Grüße ⚡", "price": 101.50});
        let frame = sign_frame(&ring(), None, Timestamp::Text("1700000000123".into()), &data).unwrap();

        assert!(frame.is_ascii());
        assert!(frame.contains(r#""note":"Gr\u00fc\u00dfe \u26a1""#));
        assert_verifies_both_forms(&frame, &data);
    }

    #[test]
    fn test_wide_integers_verify_both_forms() {
        let data: Value =
            serde_json::from_str(r#"{"type":"order_ack","id":18446744073709551616}"#).unwrap();
        let frame = sign_frame(&ring(), Some("default"), Timestamp::Numeric(1700000000), &data).unwrap();

        assert!(frame.contains(r#""id":18446744073709551616"#));
        assert_verifies_both_forms(&frame, &data);
    }

    #[test]
    fn test_key_id_in_meta() {
        let data = json!({"type": "order_ack"});
        let frame = sign_frame(&ring(), None, Timestamp::Numeric(1700000000), &data).unwrap();
        let parsed: Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(parsed["meta"]["key_id"], "2024-06");
        assert_eq!(parsed["meta"]["algo"], "HMAC-SHA256");
        assert_verifies_both_forms(&frame, &data);
    }

    #[test]
    fn test_unknown_key_id() {
        let err = sign_frame(&ring(), Some("2099-01"), Timestamp::Numeric(1), &json!({})).unwrap_err();
        assert_eq!(err, AuthError::UnknownKeyId("2099-01".into()));
    }
}
