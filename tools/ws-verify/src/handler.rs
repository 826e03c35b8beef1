//! # Frame Handler
//!
//! Authenticates frames one at a time, in delivery order, and prints one
//! `OK: <type>` line per authenticated message.
//!
//! ## Failure Policy
//!
//! | Policy   | Bad frame                                  |
//! |----------|--------------------------------------------|
//! | `Drop`   | logged at `warn`, dropped, stream continues |
//! | `Strict` | stream ends with [`HandlerError::Rejected`] |

use std::io::Write;
use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};
use ws_auth::{FrameError, MessageAuthenticatorApi, VerifiedMessage};

use crate::source::{FrameSource, SourceError};

/// What to do with a frame that fails parsing or authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Drop,
    Strict,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(FailurePolicy::Drop),
            "strict" => Ok(FailurePolicy::Strict),
            other => Err(format!("unknown failure policy {other:?}, expected drop or strict")),
        }
    }
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub authenticated: u64,
    pub rejected: u64,
    pub malformed: u64,
}

impl SessionStats {
    pub fn total(&self) -> u64 {
        self.authenticated + self.rejected + self.malformed
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Frame rejected: {0}")]
    Rejected(#[from] FrameError),

    #[error("Stream failed: {0}")]
    Source(#[from] SourceError),

    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

/// Applies the authenticator to each frame and reports the outcome.
pub struct FrameHandler<A, W> {
    authenticator: A,
    out: W,
    policy: FailurePolicy,
    stats: SessionStats,
}

impl<A: MessageAuthenticatorApi, W: Write> FrameHandler<A, W> {
    pub fn new(authenticator: A, out: W, policy: FailurePolicy) -> Self {
        Self {
            authenticator,
            out,
            policy,
            stats: SessionStats::default(),
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Handles one frame.
    ///
    /// Returns the message if it authenticated, `None` if it was dropped,
    /// and an error only under [`FailurePolicy::Strict`] or when output
    /// cannot be written.
    pub fn handle(&mut self, frame: &str) -> Result<Option<VerifiedMessage>, HandlerError> {
        match self.authenticator.verify_frame(frame) {
            Ok(msg) => {
                self.stats.authenticated += 1;
                writeln!(self.out, "OK: {}", msg.msg_type().unwrap_or("-"))
                    .and_then(|_| self.out.flush())
                    .map_err(HandlerError::Output)?;
                Ok(Some(msg))
            }
            Err(err) => {
                match &err {
                    FrameError::Malformed(reason) => {
                        self.stats.malformed += 1;
                        warn!(%reason, "Dropping malformed frame");
                    }
                    FrameError::Auth(reason) => {
                        self.stats.rejected += 1;
                        warn!(%reason, "Dropping unauthenticated message");
                    }
                }
                match self.policy {
                    FailurePolicy::Drop => Ok(None),
                    FailurePolicy::Strict => Err(HandlerError::Rejected(err)),
                }
            }
        }
    }

    /// Drains `source` through [`handle`](Self::handle) and logs a summary.
    pub async fn run<S>(&mut self, source: &mut S) -> Result<SessionStats, HandlerError>
    where
        S: FrameSource + ?Sized,
    {
        let result = self.drain(source).await;
        self.log_summary();
        result.map(|_| self.stats)
    }

    async fn drain<S>(&mut self, source: &mut S) -> Result<(), HandlerError>
    where
        S: FrameSource + ?Sized,
    {
        while let Some(frame) = source.next_frame().await? {
            self.handle(&frame)?;
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!(
            authenticated = self.stats.authenticated,
            rejected = self.stats.rejected,
            malformed = self.stats.malformed,
            "Session summary"
        );
    }
}
