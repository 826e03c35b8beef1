//! Fuzz target for frame authentication.
//!
//! Feeds arbitrary text to `verify_frame` in both canonical forms. Frames
//! come straight off the network, so nothing here may panic.
//!
//! ## Running
//!
//! ```bash
//! cd crates/ws-auth
//! cargo +nightly fuzz run fuzz_verify_frame
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use ws_auth::{CanonicalForm, MessageAuthenticator, MessageAuthenticatorApi, StaticSecret};

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = std::str::from_utf8(data) else {
        return;
    };

    for form in [CanonicalForm::Compact, CanonicalForm::Verbatim] {
        let auth = MessageAuthenticator::with_form(
            StaticSecret::from_bytes(b"phoenyra_demo_secret".to_vec()),
            form,
        );

        // Deterministic: same frame, same verdict.
        let first = auth.verify_frame(frame);
        let second = auth.verify_frame(frame);
        assert_eq!(first.is_ok(), second.is_ok());
    }
});
