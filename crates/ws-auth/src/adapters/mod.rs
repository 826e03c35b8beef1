//! # Adapters Module
//!
//! Infrastructure adapters implementing the outbound port.

pub mod env;
pub mod static_secret;

pub use env::{load_key_ring, load_key_ring_from_env, DEMO_SECRET};
pub use static_secret::StaticSecret;
