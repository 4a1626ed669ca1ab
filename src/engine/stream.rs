//! Lazy row stream over one ingestion run

use super::run::IngestRun;
use super::types::{IngestStats, SharedStats};
use crate::error::{Error, Result};
use crate::output::Row;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::warn;

/// Rows of one ingestion, in source order.
///
/// Nothing is fetched until the stream is polled. The stream ends after the
/// last row or after the first error, which is always an
/// [`Error::Aborted`] carrying the number of rows yielded before it. In
/// buffered schema mode the rows consumed before a failure are projected
/// and yielded ahead of the error. Dropping the stream aborts any requests
/// in flight.
pub struct RowStream {
    inner: BoxStream<'static, Result<Row>>,
    stats: SharedStats,
}

struct StreamState {
    run: IngestRun,
    pending: VecDeque<Row>,
    done: bool,
}

impl StreamState {
    async fn next_row(&mut self) -> Option<Result<Row>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                self.run.stats().update(|stats| stats.add_rows(1));
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }

            match self.run.next_batch().await {
                Ok(Some(rows)) => self.pending.extend(rows),
                Ok(None) => self.done = true,
                Err(error) => {
                    self.done = true;
                    let rows_produced = self.run.stats().snapshot().rows_emitted;
                    warn!(rows_produced, error = %error, "Ingestion aborted");
                    return Some(Err(Error::aborted(rows_produced, error)));
                }
            }
        }
    }
}

impl RowStream {
    pub(crate) fn new(run: IngestRun) -> Self {
        let stats = run.stats().clone();
        let state = StreamState {
            run,
            pending: VecDeque::new(),
            done: false,
        };
        let inner = stream::unfold(state, |mut state| async move {
            let item = state.next_row().await?;
            Some((item, state))
        })
        .boxed();

        Self { inner, stats }
    }

    /// Statistics so far; final once the stream has ended
    pub fn stats(&self) -> IngestStats {
        self.stats.snapshot()
    }
}

impl Stream for RowStream {
    type Item = Result<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
