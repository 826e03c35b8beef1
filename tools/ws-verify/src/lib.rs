//! # ws-verify
//!
//! Client side of the exchange's signed WebSocket streams: configuration,
//! transport and the per-frame handler around `ws_auth`.
//!
//! - `config`: endpoint and stream selection
//! - `source`: the `FrameSource` seam (live socket or NDJSON reader)
//! - `ws`: WebSocket transport
//! - `handler`: authenticate, print, count
//! - `discovery`: `/.well-known/ws-keys` fingerprint comparison
//! - `signer`: signed frames for test fixtures and replays

pub mod config;
pub mod discovery;
pub mod handler;
pub mod signer;
pub mod source;
pub mod ws;

pub use config::{ClientConfig, ConfigError, Stream};
pub use discovery::{compare, DiscoveryClient, DiscoveryError, KeyReport, KeyStatus, WsKeysDocument};
pub use handler::{FailurePolicy, FrameHandler, HandlerError, SessionStats};
pub use signer::sign_frame;
pub use source::{FrameSource, LineSource, SourceError};
pub use ws::WsClient;
