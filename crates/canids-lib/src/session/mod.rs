//! Streaming session controller
//!
//! One session per client connection:
//! - waits for the category selection
//! - loads and preprocesses the selected dataset once
//! - classifies fixed-size row batches, majority-votes them per batch and
//!   per interval, and emits one paced message per interval
//! - finishes with the overall majority verdict

mod controller;
mod cursor;


pub use controller::{SessionContext, SessionOutcome, StreamingSession};
pub use cursor::BatchCursor;

use crate::models::ServerMessage;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default rows fed to the classifier per prediction call
pub const DEFAULT_ROWS_PER_BATCH: usize = 15;

/// Default batch labels aggregated into one interval result
pub const DEFAULT_BATCHES_PER_INTERVAL: usize = 20;

/// Default pause after each emitted interval
pub const DEFAULT_INTERVAL_DELAY: Duration = Duration::from_secs(5);

/// Default number of intervals per session (one minute at 5s pacing)
pub const DEFAULT_TOTAL_INTERVALS: usize = 12;

/// Protocol constants for a stream session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub rows_per_batch: usize,
    pub batches_per_interval: usize,
    pub interval_delay: Duration,
    pub total_intervals: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rows_per_batch: DEFAULT_ROWS_PER_BATCH,
            batches_per_interval: DEFAULT_BATCHES_PER_INTERVAL,
            interval_delay: DEFAULT_INTERVAL_DELAY,
            total_intervals: DEFAULT_TOTAL_INTERVALS,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rows_per_batch == 0 {
            anyhow::bail!("rows_per_batch must be greater than zero");
        }
        if self.batches_per_interval == 0 {
            anyhow::bail!("batches_per_interval must be greater than zero");
        }
        Ok(())
    }

    /// Rows needed to fill every interval of a session, saturating on overflow
    pub fn rows_per_session(&self) -> usize {
        self.rows_per_batch
            .saturating_mul(self.batches_per_interval)
            .saturating_mul(self.total_intervals)
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingSelection,
    Streaming,
    Completed,
    Errored,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Errored)
    }
}

/// Frame received from the client side of a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
    /// Peer closed the connection or the transport failed
    Closed,
}

/// Bidirectional message channel a session runs over
#[async_trait]
pub trait Transport: Send {
    /// Next client frame. Must be cancel-safe.
    async fn recv(&mut self) -> Inbound;

    /// Deliver one server message
    async fn send(&mut self, message: &ServerMessage) -> Result<()>;

    /// Close the channel. Failures are ignored.
    async fn close(&mut self);
}
