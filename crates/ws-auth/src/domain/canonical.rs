//! # Canonical Serialization
//!
//! The byte form of a payload that gets signed.
//!
//! The exchange signs `json.dumps(data, separators=(",", ":"))`. To verify
//! without access to those bytes the payload is re-encoded here with the same
//! rules:
//!
//! - no whitespace, `,` and `:` as separators
//! - object members in received order (`serde_json` is built with
//!   `preserve_order`)
//! - everything outside printable ASCII escaped as lowercase `\uXXXX`
//! - integers as written, at any size (`serde_json` is built with
//!   `arbitrary_precision`)
//! - floats in shortest round-trip form, exponent notation outside
//!   `1e-4 <= |x| < 1e16` (`1e+16`, `1e-05`), otherwise always with a
//!   fractional part (`2.0`)
//!
//! Two encodings that differ in member order or whitespace are different
//! byte strings and sign differently. No semantic JSON equality is applied.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;

use super::entities::Timestamp;
use super::errors::AuthError;

/// Separator between the timestamp and the payload in the signed message.
pub const SIGNED_MESSAGE_SEPARATOR: u8 = b'|';

/// How the payload bytes for the MAC are obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CanonicalForm {
    /// Re-encode the parsed payload with [`CanonicalFormatter`].
    #[default]
    Compact,
    /// Use the payload bytes exactly as they appear inside the frame.
    Verbatim,
}

impl std::str::FromStr for CanonicalForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" => Ok(CanonicalForm::Compact),
            "verbatim" => Ok(CanonicalForm::Verbatim),
            other => Err(format!("unknown canonical form: {other}")),
        }
    }
}

/// Compact JSON formatter with ASCII-only output.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        // Fragments never contain `"`, `\` or C0 controls; serde_json routes
        // those through write_char_escape.
        if fragment.bytes().all(|b| (0x20..0x7f).contains(&b)) {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if (' '..='~').contains(&c) {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }

    // With `arbitrary_precision` every `Number` arrives here as its source
    // text. Integers keep their digits at any size; everything else is a
    // float and gets the float form.
    fn write_number_str<W>(&mut self, writer: &mut W, value: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if is_integer_literal(value) {
            let digits = if value == "-0" { "0" } else { value };
            return writer.write_all(digits.as_bytes());
        }
        match value.parse::<f64>() {
            Ok(f) => writer.write_all(format_float(f).as_bytes()),
            Err(_) => writer.write_all(value.as_bytes()),
        }
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(format_float(value).as_bytes())
    }

    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(format_float(f64::from(value)).as_bytes())
    }
}

/// `-?[0-9]+`, the JSON integer production.
fn is_integer_literal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Formats a float the way the exchange's signer prints it.
fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    // `{:e}` yields the shortest round-trip digits, e.g. "1.5e-5".
    let sci = format!("{:e}", value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if (-4..16).contains(&exponent) {
        let positional = value.to_string();
        if positional.contains('.') {
            positional
        } else {
            format!("{positional}.0")
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

/// Serializes `value` into its canonical signed bytes.
pub fn canonical_json<T>(value: &T) -> Result<Vec<u8>, AuthError>
where
    T: Serialize + ?Sized,
{
    let mut out = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    value
        .serialize(&mut ser)
        .map_err(|e| AuthError::Serialization(e.to_string()))?;
    Ok(out)
}

/// Convenience wrapper for the common `Value` case.
pub fn canonical_value(value: &Value) -> Result<Vec<u8>, AuthError> {
    canonical_json(value)
}

/// Builds `ts || "|" || payload`, the exact input to the MAC.
pub fn signed_message(ts: &Timestamp, payload: &[u8]) -> Vec<u8> {
    let ts = ts.to_string();
    let mut message = Vec::with_capacity(ts.len() + 1 + payload.len());
    message.extend_from_slice(ts.as_bytes());
    message.push(SIGNED_MESSAGE_SEPARATOR);
    message.extend_from_slice(payload);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canon(v: &Value) -> String {
        String::from_utf8(canonical_value(v).unwrap()).unwrap()
    }

    #[test]
    fn test_compact_separators() {
        let v = json!({"type": "order_ack", "ids": [1, 2, 3], "nested": {"a": null, "b": true}});
        assert_eq!(
            canon(&v),
            r#"{"type":"order_ack","ids":[1,2,3],"nested":{"a":null,"b":true}}"#
        );
    }

    #[test]
    fn test_member_order_preserved() {
        let v: Value = serde_json::from_str(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        assert_eq!(canon(&v), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn test_non_ascii_escaped() {
        let v = json!({"note": "Grüße"});
        assert_eq!(canon(&v), r#"{"note":"Gr\u00fc\u00dfe"}"#);
    }

    #[test]
    fn test_astral_plane_uses_surrogates() {
        let v = json!("⚡🔋");
        assert_eq!(canon(&v), r#""\u26a1\ud83d\udd0b""#);
    }

    #[test]
    fn test_control_and_delete_escapes() {
        let v = json!("a\"b\\c\nd\te\u{1}f\u{7f}");
        assert_eq!(canon(&v), r#""a\"b\\c\nd\te\u0001f\u007f""#);
    }

    #[test]
    fn test_float_forms() {
        assert_eq!(format_float(101.5), "101.5");
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(-0.0), "-0.0");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(1e-5), "1e-05");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e300), "1.5e+300");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_floats_inside_documents() {
        let v: Value = serde_json::from_str(r#"{"bids":[[99.5,1e-05]],"asks":[[1e16,2.0]]}"#).unwrap();
        assert_eq!(canon(&v), r#"{"bids":[[99.5,1e-05]],"asks":[[1e+16,2.0]]}"#);
    }

    #[test]
    fn test_integers_beyond_64_bits_keep_their_digits() {
        let v: Value = serde_json::from_str(
            r#"{"id":18446744073709551616,"neg":-0,"big":-123456789012345678901234567890}"#,
        )
        .unwrap();
        assert_eq!(
            canon(&v),
            r#"{"id":18446744073709551616,"neg":0,"big":-123456789012345678901234567890}"#
        );
    }

    #[test]
    fn test_float_literals_are_normalized() {
        let v: Value = serde_json::from_str(r#"[1.50,2E0,1.0e+16,0.00001,-0.0]"#).unwrap();
        assert_eq!(canon(&v), "[1.5,2.0,1e+16,1e-05,-0.0]");
    }

    #[test]
    fn test_signed_message_layout() {
        let msg = signed_message(&Timestamp::Numeric(1700000000), br#"{"type":"order_ack"}"#);
        assert_eq!(msg, br#"1700000000|{"type":"order_ack"}"#.to_vec());
    }

    #[test]
    fn test_canonical_form_parse() {
        assert_eq!("compact".parse::<CanonicalForm>(), Ok(CanonicalForm::Compact));
        assert_eq!("verbatim".parse::<CanonicalForm>(), Ok(CanonicalForm::Verbatim));
        assert!("pretty".parse::<CanonicalForm>().is_err());
    }
}
