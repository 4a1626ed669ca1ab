//! One ingestion run
//!
//! Drives the cursor, keeps up to `concurrency` page fetches in flight and
//! releases pages strictly in index order through a reorder buffer.

use super::types::SharedStats;
use crate::error::{Error, Result};
use crate::http::{FetchedPage, PageFetcher, RequestTemplate};
use crate::output::Row;
use crate::pagination::{CursorStep, PageRequest, PaginationCursor};
use crate::record::Record;
use crate::schema::{Schema, SchemaReconciler};
use crate::types::SchemaMode;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Page index, launch id and outcome of one fetch
type Fetch = BoxFuture<'static, (u64, u64, Result<FetchedPage>)>;

/// Per-run limits taken from the config
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunLimits {
    pub concurrency: usize,
    pub max_rows: Option<u64>,
    pub mode: SchemaMode,
    pub timeout: Option<Duration>,
    pub strategy: &'static str,
}

pub(crate) struct IngestRun {
    fetcher: PageFetcher,
    template: RequestTemplate,
    cursor: PaginationCursor,
    reconciler: SchemaReconciler,
    limits: RunLimits,
    lookahead: bool,

    in_flight: FuturesUnordered<Fetch>,
    /// Requests launched and not yet consumed, with their launch id
    launched: BTreeMap<u64, (u64, PageRequest)>,
    /// Reorder buffer of completed fetches
    completed: BTreeMap<u64, Result<FetchedPage>>,
    next_launch: u64,
    launch_seq: u64,
    /// Request whose page is consumed next; `None` once pagination stopped
    expected: Option<PageRequest>,

    started: bool,
    finished: bool,
    pending_error: Option<Error>,
    records_taken: u64,
    buffered: Vec<Record>,
    snapshot: Arc<Schema>,

    stats: SharedStats,
    begun: Instant,
    deadline: Option<Instant>,
    cancel: watch::Receiver<bool>,
}

impl IngestRun {
    pub(crate) fn new(
        fetcher: PageFetcher,
        template: RequestTemplate,
        cursor: PaginationCursor,
        reconciler: SchemaReconciler,
        limits: RunLimits,
        cancel: watch::Receiver<bool>,
        stats: SharedStats,
    ) -> Self {
        let lookahead = limits.concurrency > 1 && cursor.supports_lookahead();
        Self {
            fetcher,
            template,
            cursor,
            reconciler,
            limits,
            lookahead,
            in_flight: FuturesUnordered::new(),
            launched: BTreeMap::new(),
            completed: BTreeMap::new(),
            next_launch: 0,
            launch_seq: 0,
            expected: None,
            started: false,
            finished: false,
            pending_error: None,
            records_taken: 0,
            buffered: Vec::new(),
            snapshot: Arc::new(Schema::new()),
            stats,
            begun: Instant::now(),
            deadline: None,
            cancel,
        }
    }

    pub(crate) fn stats(&self) -> &SharedStats {
        &self.stats
    }

    /// Next rows in order; `None` when the ingestion completed.
    ///
    /// Buffered mode yields everything in one batch at the end. Eager mode
    /// yields one batch per non-empty page.
    pub(crate) async fn next_batch(&mut self) -> Result<Option<Vec<Row>>> {
        if !self.started {
            self.start();
        }

        loop {
            if self.finished {
                return Ok(None);
            }
            if let Some(error) = self.pending_error.take() {
                return self.fail(error);
            }
            if let Err(error) = self.check_interrupts() {
                return self.fail(error);
            }

            let Some(index) = self.expected.as_ref().map(|request| request.index) else {
                return self.finish();
            };

            if let Some(result) = self.completed.remove(&index) {
                self.launched.remove(&index);
                let rows = match result.and_then(|page| self.consume(index, page)) {
                    Ok(rows) => rows,
                    Err(error) => return self.fail(error),
                };
                if !rows.is_empty() {
                    return Ok(Some(rows));
                }
                continue;
            }

            if let Err(error) = self.fill() {
                return self.fail(error);
            }
            if let Err(error) = self.wait().await {
                return self.fail(error);
            }
        }
    }

    /// Record the elapsed time in the stats
    pub(crate) fn record_duration(&self) {
        let ms = self.begun.elapsed().as_millis() as u64;
        self.stats.update(|stats| stats.set_duration(ms));
    }

    fn start(&mut self) {
        self.started = true;
        self.begun = Instant::now();
        self.deadline = self.limits.timeout.map(|timeout| self.begun + timeout);

        info!(
            url = %self.template.base_url,
            strategy = self.limits.strategy,
            concurrency = self.limits.concurrency,
            lookahead = self.lookahead,
            "Starting ingestion"
        );

        if self.limits.max_rows == Some(0) {
            return;
        }
        match self.cursor.first_request() {
            CursorStep::Next(request) => self.expected = Some(request),
            CursorStep::Done(reason) => debug!(%reason, "Nothing to fetch"),
        }
    }

    fn check_interrupts(&self) -> Result<()> {
        if *self.cancel.borrow() {
            return Err(Error::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(self.timeout_error());
        }
        Ok(())
    }

    fn timeout_error(&self) -> Error {
        Error::Timeout {
            timeout_ms: self
                .limits
                .timeout
                .map_or(0, |timeout| timeout.as_millis() as u64),
        }
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// Make sure the expected page is requested, then look ahead as far as
    /// the concurrency ceiling allows
    fn fill(&mut self) -> Result<()> {
        let Some(expected) = self.expected.clone() else {
            return Ok(());
        };

        let launched = self.launched.get(&expected.index).map(|(_, request)| request);
        if launched != Some(&expected) {
            if launched.is_some() {
                debug!(page = expected.index, "Predicted request differs, refetching");
            }
            self.launch(expected)?;
        }

        if !self.lookahead {
            return Ok(());
        }
        while self.launched.len() < self.limits.concurrency {
            let Some(request) = self.cursor.request_at(self.next_launch) else {
                break;
            };
            self.launch(request)?;
        }
        Ok(())
    }

    fn launch(&mut self, request: PageRequest) -> Result<()> {
        let http = self.template.render(&request)?;
        let fetcher = self.fetcher.clone();
        let index = request.index;
        self.launch_seq += 1;
        let launch_id = self.launch_seq;

        debug!(page = index, url = %http.url, "Requesting page");
        self.in_flight.push(Box::pin(async move {
            let result = fetcher.fetch(&http).await;
            (index, launch_id, result)
        }));
        self.launched.insert(index, (launch_id, request));
        self.next_launch = self.next_launch.max(index + 1);
        Ok(())
    }

    /// Wait for one fetch to complete and buffer it
    async fn wait(&mut self) -> Result<()> {
        let deadline = self.deadline;
        let timeout = self.timeout_error();
        let (index, launch_id, result) = tokio::select! {
            biased;
            () = cancelled(&mut self.cancel) => return Err(Error::Cancelled),
            () = expires(deadline) => return Err(timeout),
            Some(done) = self.in_flight.next() => done,
        };

        // Results of superseded launches are dropped
        if self
            .launched
            .get(&index)
            .is_some_and(|(id, _)| *id == launch_id)
        {
            self.completed.insert(index, result);
        }
        Ok(())
    }

    /// Drop every outstanding fetch; nothing more is requested
    fn stop(&mut self) {
        self.expected = None;
        self.in_flight = FuturesUnordered::new();
        self.launched.clear();
        self.completed.clear();
    }

    // ========================================================================
    // Pages
    // ========================================================================

    fn consume(&mut self, index: u64, fetched: FetchedPage) -> Result<Vec<Row>> {
        let FetchedPage { page, attempts } = fetched;
        self.stats.update(|stats| stats.add_page(attempts));
        debug!(page = index, records = page.len(), attempts, "Page received");

        let mut records = page.records;
        let mut limit_reached = false;
        if let Some(max_rows) = self.limits.max_rows {
            let remaining = max_rows.saturating_sub(self.records_taken);
            if records.len() as u64 >= remaining {
                records.truncate(remaining as usize);
                limit_reached = true;
            }
        }
        self.records_taken += records.len() as u64;

        if limit_reached {
            debug!(max_rows = ?self.limits.max_rows, "Row limit reached");
            self.stop();
        } else {
            match self.cursor.advance(&page.metadata) {
                Ok(CursorStep::Next(request)) => self.expected = Some(request),
                Ok(CursorStep::Done(reason)) => {
                    debug!(page = index, %reason, "Pagination finished");
                    self.stop();
                }
                Err(error) => {
                    // This page is still valid; the error surfaces after its rows
                    self.stop();
                    self.pending_error = Some(error);
                }
            }
        }

        self.take(records)
    }

    fn take(&mut self, records: Vec<Record>) -> Result<Vec<Row>> {
        self.reconciler.observe_all(&records);
        match self.limits.mode {
            SchemaMode::Buffered => {
                self.buffered.extend(records);
                Ok(Vec::new())
            }
            SchemaMode::Eager => {
                if *self.snapshot != *self.reconciler.schema() {
                    self.snapshot = Arc::new(self.reconciler.finalize());
                }
                self.reconciler.project_all(&records, &self.snapshot)
            }
        }
    }

    fn finish(&mut self) -> Result<Option<Vec<Row>>> {
        self.finished = true;

        let rows = match self.limits.mode {
            SchemaMode::Buffered => {
                let schema = Arc::new(self.reconciler.finalize());
                let records = std::mem::take(&mut self.buffered);
                self.reconciler.project_all(&records, &schema)?
            }
            SchemaMode::Eager => Vec::new(),
        };

        self.record_duration();
        let stats = self.stats.snapshot();
        info!(
            pages = stats.pages_fetched,
            rows = self.records_taken,
            retries = stats.retries,
            columns = self.reconciler.schema().len(),
            duration_ms = stats.duration_ms,
            "Ingestion complete"
        );

        Ok((!rows.is_empty()).then_some(rows))
    }

    /// Stop the run with `error`.
    ///
    /// Records buffered for a final schema are projected and returned first;
    /// the error follows on the next call.
    fn fail(&mut self, error: Error) -> Result<Option<Vec<Row>>> {
        self.stop();

        if !self.buffered.is_empty() {
            let records = std::mem::take(&mut self.buffered);
            let schema = Arc::new(self.reconciler.finalize());
            match self.reconciler.project_all(&records, &schema) {
                Ok(rows) if !rows.is_empty() => {
                    debug!(
                        rows = rows.len(),
                        error = %error,
                        "Releasing buffered rows before failing"
                    );
                    self.pending_error = Some(error);
                    return Ok(Some(rows));
                }
                Ok(_) => {}
                Err(project_error) => {
                    warn!(error = %project_error, "Buffered rows could not be projected");
                }
            }
        }

        self.finished = true;
        self.record_duration();
        Err(error)
    }
}

/// Resolves once the cancel flag is set
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Resolves at the deadline, never without one
async fn expires(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
