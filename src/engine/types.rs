//! Engine types
//!
//! Statistics, cancellation and the failure value of table ingestion.

use crate::error::Error;
use crate::output::Table;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

// ============================================================================
// Statistics
// ============================================================================

/// Statistics for one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Pages consumed in order
    pub pages_fetched: u64,
    /// Rows handed to the caller
    pub rows_emitted: u64,
    /// Retried attempts across all pages
    pub retries: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl IngestStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page and the attempts it took
    pub fn add_page(&mut self, attempts: u32) {
        self.pages_fetched += 1;
        self.retries += u64::from(attempts.saturating_sub(1));
    }

    /// Add rows
    pub fn add_rows(&mut self, count: u64) {
        self.rows_emitted += count;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Stats shared between a run and the stream that exposes it
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedStats(Arc<Mutex<IngestStats>>);

impl SharedStats {
    pub(crate) fn update(&self, f: impl FnOnce(&mut IngestStats)) {
        if let Ok(mut stats) = self.0.lock() {
            f(&mut stats);
        }
    }

    pub(crate) fn snapshot(&self) -> IngestStats {
        self.0.lock().map(|stats| stats.clone()).unwrap_or_default()
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Stops ingestions started by one engine.
///
/// Cancelling is sticky: ingestions started afterwards fail right away
/// until [`CancelHandle::reset`] is called.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Stop at the next page boundary and abort requests in flight
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Allow new ingestions again
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

// ============================================================================
// Failure
// ============================================================================

/// A failed table ingestion, with the rows produced before the failure
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct IngestFailure {
    /// The terminal error, wrapped in [`Error::Aborted`]
    #[source]
    pub error: Error,
    /// Rows produced before the failure
    pub partial: Table,
    /// Statistics up to the failure
    pub stats: IngestStats,
}

impl IngestFailure {
    /// The underlying cause, looking through abort and retry wrappers
    pub fn root(&self) -> &Error {
        self.error.root()
    }

    /// Rows produced before the failure
    pub fn rows_produced(&self) -> u64 {
        self.error.rows_produced().unwrap_or(0)
    }
}
