//! WebSocket transport for exchange streams.

mod client;

pub use client::WsClient;
