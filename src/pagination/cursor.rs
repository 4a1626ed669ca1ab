//! Pagination cursor
//!
//! Owns the paging state of one ingestion run and decides, page by page,
//! what to request next or that the source is exhausted.

use super::types::{PageMetadata, PagePosition, PageRequest, Paginator};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Default number of recent tokens checked for repeats
pub const DEFAULT_REPEAT_WINDOW: usize = 8;

/// Lifecycle of a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorPhase {
    /// No request issued yet
    #[default]
    Initial,
    /// A request is outstanding
    HasNext,
    /// Terminal
    Exhausted,
}

/// Why pagination ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// The last page had no records
    EmptyPage,
    /// The server signalled there is nothing more
    StopSignal,
    /// The strategy found no next position (short page, missing cursor)
    NoMorePages,
    /// A total count or total pages hint was reached
    TotalReached,
    /// `max_pages` requests have been issued
    MaxPages,
}

impl fmt::Display for DoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPage => write!(f, "empty page"),
            Self::StopSignal => write!(f, "stop signal"),
            Self::NoMorePages => write!(f, "no more pages"),
            Self::TotalReached => write!(f, "total reached"),
            Self::MaxPages => write!(f, "max pages"),
        }
    }
}

/// Outcome of a cursor step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorStep {
    /// Fetch this page next
    Next(PageRequest),
    /// Pagination is over
    Done(DoneReason),
}

impl CursorStep {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// The request, if any
    pub fn request(&self) -> Option<&PageRequest> {
        match self {
            Self::Next(request) => Some(request),
            Self::Done(_) => None,
        }
    }
}

/// Mutable paging state
#[derive(Debug, Clone, Default)]
pub struct CursorState {
    pub phase: CursorPhase,
    /// Index of the last issued request
    pub page_index: u64,
    /// Position of the last issued request
    pub position: Option<PagePosition>,
    /// Records seen on committed pages
    pub rows_seen: u64,
    /// Last issued request
    pub last_request: Option<PageRequest>,
    /// Recent cursor tokens or URLs, oldest first
    pub recent_tokens: VecDeque<String>,
    /// Set once exhausted
    pub done_reason: Option<DoneReason>,
}

/// Walks a paginated source one page at a time
#[derive(Debug)]
pub struct PaginationCursor {
    paginator: Arc<dyn Paginator>,
    max_pages: Option<u64>,
    repeat_window: usize,
    state: CursorState,
}

impl PaginationCursor {
    /// Create a cursor over a strategy
    pub fn new(paginator: Arc<dyn Paginator>) -> Self {
        Self {
            paginator,
            max_pages: None,
            repeat_window: DEFAULT_REPEAT_WINDOW,
            state: CursorState::default(),
        }
    }

    /// Cap the number of requests issued
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<u64>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Number of recent tokens checked for repeats
    #[must_use]
    pub fn with_repeat_window(mut self, window: usize) -> Self {
        self.repeat_window = window.max(1);
        self
    }

    /// The strategy in use
    pub fn paginator(&self) -> &Arc<dyn Paginator> {
        &self.paginator
    }

    pub fn phase(&self) -> CursorPhase {
        self.state.phase
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Return to the initial state
    pub fn reset(&mut self) {
        self.state = CursorState::default();
    }

    /// Whether page requests can be computed ahead of their predecessors
    pub fn supports_lookahead(&self) -> bool {
        self.paginator.predict(1).is_some()
    }

    /// Start over and issue the first request
    pub fn first_request(&mut self) -> CursorStep {
        self.reset();

        if self.max_pages == Some(0) {
            self.exhaust(DoneReason::MaxPages);
            return CursorStep::Done(DoneReason::MaxPages);
        }

        let request = self.paginator.request(0, self.paginator.initial());
        self.commit_request(&request);
        CursorStep::Next(request)
    }

    /// What follows the outstanding request, given its page's metadata.
    ///
    /// Pure: calling it any number of times with the same state and metadata
    /// yields the same step.
    pub fn peek(&self, meta: &PageMetadata) -> Result<CursorStep> {
        match self.state.phase {
            CursorPhase::Exhausted => {
                return Ok(CursorStep::Done(
                    self.state.done_reason.unwrap_or(DoneReason::NoMorePages),
                ));
            }
            CursorPhase::Initial => {
                return Err(Error::config("cursor advanced before first_request"));
            }
            CursorPhase::HasNext => {}
        }

        if meta.record_count == 0 {
            return Ok(CursorStep::Done(DoneReason::EmptyPage));
        }
        if meta.stop_signal {
            return Ok(CursorStep::Done(DoneReason::StopSignal));
        }

        let rows_seen = self.state.rows_seen.saturating_add(meta.record_count);
        if meta.total_count.is_some_and(|total| rows_seen >= total) {
            return Ok(CursorStep::Done(DoneReason::TotalReached));
        }
        let pages_seen = self.state.page_index + 1;
        if meta.total_pages.is_some_and(|total| pages_seen >= total) {
            return Ok(CursorStep::Done(DoneReason::TotalReached));
        }

        let next_index = self.state.page_index + 1;
        if self.max_pages.is_some_and(|max| next_index >= max) {
            return Ok(CursorStep::Done(DoneReason::MaxPages));
        }

        let Some(current) = &self.state.position else {
            return Ok(CursorStep::Done(DoneReason::NoMorePages));
        };
        let Some(position) = self.paginator.next(current, meta) else {
            return Ok(CursorStep::Done(DoneReason::NoMorePages));
        };

        if let Some(token) = position.token() {
            if self.state.recent_tokens.iter().any(|seen| seen == token) {
                return Err(Error::PaginationLoop {
                    page_index: next_index,
                    token: token.to_string(),
                });
            }
        } else if &position == current {
            return Err(Error::PaginationLoop {
                page_index: next_index,
                token: position.to_string(),
            });
        }

        Ok(CursorStep::Next(self.paginator.request(next_index, position)))
    }

    /// Commit the step `peek` computes for `meta`
    pub fn advance(&mut self, meta: &PageMetadata) -> Result<CursorStep> {
        let step = match self.peek(meta) {
            Ok(step) => step,
            Err(e) => {
                self.state.phase = CursorPhase::Exhausted;
                return Err(e);
            }
        };

        if self.state.phase == CursorPhase::Exhausted {
            return Ok(step);
        }

        self.state.rows_seen += meta.record_count;
        match &step {
            CursorStep::Next(request) => self.commit_request(request),
            CursorStep::Done(reason) => self.exhaust(*reason),
        }
        Ok(step)
    }

    /// Request for page `index` computed without earlier pages.
    ///
    /// `None` when the strategy cannot look ahead or `index` is past
    /// `max_pages`. Equals the request `advance` yields for that index.
    pub fn request_at(&self, index: u64) -> Option<PageRequest> {
        if self.max_pages.is_some_and(|max| index >= max) {
            return None;
        }
        let position = self.paginator.predict(index)?;
        Some(self.paginator.request(index, position))
    }

    fn commit_request(&mut self, request: &PageRequest) {
        if let Some(token) = request.position.token() {
            self.state.recent_tokens.push_back(token.to_string());
            while self.state.recent_tokens.len() > self.repeat_window {
                self.state.recent_tokens.pop_front();
            }
        }
        self.state.page_index = request.index;
        self.state.position = Some(request.position.clone());
        self.state.last_request = Some(request.clone());
        self.state.phase = CursorPhase::HasNext;
    }

    fn exhaust(&mut self, reason: DoneReason) {
        self.state.phase = CursorPhase::Exhausted;
        self.state.done_reason = Some(reason);
    }
}
