//! # Domain Layer
//!
//! Envelope types, canonical serialization, key material and the HMAC check.
//! Pure logic with no I/O dependencies.

pub mod canonical;
pub mod entities;
pub mod errors;
pub mod keys;
pub mod signing;
