//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that the stream handler calls
//! - **Outbound (Driven)**: Key material this crate needs

pub mod inbound;
pub mod outbound;
