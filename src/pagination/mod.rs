//! Pagination module
//!
//! Supports: Cursor, Offset, Page Number, Next URL
//!
//! # Overview
//!
//! The pagination module provides a unified interface for handling different
//! API pagination patterns. Strategies are stateless and only know how to
//! read their metadata out of a response body and compute the next position.
//! `PaginationCursor` owns the state of one run and decides when the source
//! is exhausted.
//!
//! # Features
//!
//! - Empty page, stop signal, short page, total hints and `max_pages` bounds
//! - Pure `peek` and committing `advance`
//! - Repeated cursor/URL detection over a recent-token window
//! - Lookahead for offset and page number strategies

mod cursor;
mod strategies;
mod types;

pub use cursor::{
    CursorPhase, CursorState, CursorStep, DoneReason, PaginationCursor, DEFAULT_REPEAT_WINDOW,
};
pub use strategies::{
    CursorPaginator, NextUrlPaginator, NoPaginator, OffsetPaginator, PageNumberPaginator,
};
pub use types::{
    PageMetadata, PagePosition, PageRequest, PaginationConfig, Paginator, StopCondition,
};
