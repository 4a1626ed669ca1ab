//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{PageMetadata, PagePosition, PaginationConfig, Paginator, StopCondition};
use crate::types::{lookup_scalar, JsonValue, OptionStringExt, StringMap};
use std::sync::Arc;

impl PaginationConfig {
    /// Build the strategy for this config
    pub fn build(&self) -> Arc<dyn Paginator> {
        match self.clone() {
            PaginationConfig::None => Arc::new(NoPaginator),
            PaginationConfig::Cursor {
                cursor_param,
                cursor_path,
                page_size_param,
                page_size,
                stop_condition,
            } => Arc::new(CursorPaginator {
                cursor_param,
                cursor_path,
                page_size: page_size_param.zip(page_size),
                stop_condition,
            }),
            PaginationConfig::Offset {
                offset_param,
                limit_param,
                limit,
                start_offset,
                stop_condition,
            } => Arc::new(OffsetPaginator {
                offset_param,
                limit_param,
                limit,
                start_offset,
                stop_condition,
            }),
            PaginationConfig::PageNumber {
                page_param,
                start_page,
                page_size_param,
                page_size,
                stop_condition,
            } => Arc::new(PageNumberPaginator {
                page_param,
                start_page,
                page_size_param,
                page_size,
                stop_condition,
            }),
            PaginationConfig::NextUrl {
                next_url_path,
                stop_condition,
            } => Arc::new(NextUrlPaginator {
                path: next_url_path,
                stop_condition,
            }),
        }
    }
}

fn base_metadata(condition: &StopCondition, body: &JsonValue, record_count: u64) -> PageMetadata {
    let mut meta = PageMetadata::with_count(record_count);
    condition.apply(body, &mut meta);
    meta
}

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination (e.g., Stripe, Slack)
///
/// Uses a cursor value from the response to fetch the next page.
/// Common patterns:
/// - `?starting_after=obj_123`
/// - `?cursor=abc123`
///
/// A missing or empty cursor ends pagination.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Query parameter name for cursor
    pub cursor_param: String,
    /// Dotted path to the cursor in the response body
    pub cursor_path: String,
    /// Page size parameter name and value
    pub page_size: Option<(String, u64)>,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl Paginator for CursorPaginator {
    fn initial(&self) -> PagePosition {
        PagePosition::Start
    }

    fn metadata(&self, body: &JsonValue, record_count: u64) -> PageMetadata {
        let mut meta = base_metadata(&self.stop_condition, body, record_count);
        meta.next_token = lookup_scalar(body, &self.cursor_path).none_if_empty();
        meta
    }

    fn next(&self, _current: &PagePosition, meta: &PageMetadata) -> Option<PagePosition> {
        meta.next_token.clone().map(PagePosition::Cursor)
    }

    fn query_params(&self, position: &PagePosition) -> StringMap {
        let mut params = StringMap::new();
        if let PagePosition::Cursor(cursor) = position {
            params.insert(self.cursor_param.clone(), cursor.clone());
        }
        if let Some((param, size)) = &self.page_size {
            params.insert(param.clone(), size.to_string());
        }
        params
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination (e.g., SQL-style pagination)
///
/// Uses offset and limit parameters to paginate.
/// Common patterns:
/// - `?offset=100&limit=50`
/// - `?skip=100&take=50`
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for limit
    pub limit_param: String,
    /// Number of records per page
    pub limit: u64,
    /// First offset
    pub start_offset: u64,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl Paginator for OffsetPaginator {
    fn initial(&self) -> PagePosition {
        PagePosition::Offset(self.start_offset)
    }

    fn metadata(&self, body: &JsonValue, record_count: u64) -> PageMetadata {
        base_metadata(&self.stop_condition, body, record_count)
    }

    fn next(&self, current: &PagePosition, meta: &PageMetadata) -> Option<PagePosition> {
        // A short page is the last one
        if meta.record_count < self.limit {
            return None;
        }
        match current {
            PagePosition::Offset(offset) => {
                offset.checked_add(self.limit).map(PagePosition::Offset)
            }
            _ => None,
        }
    }

    fn predict(&self, index: u64) -> Option<PagePosition> {
        let offset = index
            .checked_mul(self.limit)?
            .checked_add(self.start_offset)?;
        Some(PagePosition::Offset(offset))
    }

    fn query_params(&self, position: &PagePosition) -> StringMap {
        let mut params = StringMap::new();
        if let PagePosition::Offset(offset) = position {
            params.insert(self.offset_param.clone(), offset.to_string());
        }
        params.insert(self.limit_param.clone(), self.limit.to_string());
        params
    }
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Page number pagination (e.g., traditional web pagination)
///
/// Uses page number parameter to paginate.
/// Common patterns:
/// - `?page=2`
/// - `?page=2&per_page=50`
#[derive(Debug, Clone)]
pub struct PageNumberPaginator {
    /// Query parameter name for page number
    pub page_param: String,
    /// First page number (usually 0 or 1)
    pub start_page: u64,
    /// Optional page size parameter name
    pub page_size_param: Option<String>,
    /// Page size value
    pub page_size: Option<u64>,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl Paginator for PageNumberPaginator {
    fn initial(&self) -> PagePosition {
        PagePosition::Page(self.start_page)
    }

    fn metadata(&self, body: &JsonValue, record_count: u64) -> PageMetadata {
        base_metadata(&self.stop_condition, body, record_count)
    }

    fn next(&self, current: &PagePosition, meta: &PageMetadata) -> Option<PagePosition> {
        // If we have a page size and got fewer records, we're done
        if let Some(size) = self.page_size {
            if meta.record_count < size {
                return None;
            }
        }
        match current {
            PagePosition::Page(page) => page.checked_add(1).map(PagePosition::Page),
            _ => None,
        }
    }

    fn predict(&self, index: u64) -> Option<PagePosition> {
        self.start_page.checked_add(index).map(PagePosition::Page)
    }

    fn query_params(&self, position: &PagePosition) -> StringMap {
        let mut params = StringMap::new();
        if let PagePosition::Page(page) = position {
            params.insert(self.page_param.clone(), page.to_string());
        }
        if let (Some(param), Some(size)) = (&self.page_size_param, self.page_size) {
            params.insert(param.clone(), size.to_string());
        }
        params
    }
}

// ============================================================================
// Next URL Pagination
// ============================================================================

/// Next URL pagination (URL in response body)
///
/// Extracts next page URL from a field in the response body.
/// Common patterns:
/// - `{ "next": "https://api.example.com/items?page=2" }`
/// - `{ "pagination": { "next_url": "..." } }`
#[derive(Debug, Clone)]
pub struct NextUrlPaginator {
    /// Dotted path to the next URL
    pub path: String,
    /// Stop condition
    pub stop_condition: StopCondition,
}

impl Paginator for NextUrlPaginator {
    fn initial(&self) -> PagePosition {
        PagePosition::Start
    }

    fn metadata(&self, body: &JsonValue, record_count: u64) -> PageMetadata {
        let mut meta = base_metadata(&self.stop_condition, body, record_count);
        meta.next_url = lookup_scalar(body, &self.path).none_if_empty();
        meta
    }

    fn next(&self, _current: &PagePosition, meta: &PageMetadata) -> Option<PagePosition> {
        meta.next_url.clone().map(PagePosition::Url)
    }

    fn query_params(&self, _position: &PagePosition) -> StringMap {
        StringMap::new()
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn initial(&self) -> PagePosition {
        PagePosition::Start
    }

    fn metadata(&self, _body: &JsonValue, record_count: u64) -> PageMetadata {
        PageMetadata::with_count(record_count)
    }

    fn next(&self, _current: &PagePosition, _meta: &PageMetadata) -> Option<PagePosition> {
        None
    }

    fn predict(&self, index: u64) -> Option<PagePosition> {
        (index == 0).then_some(PagePosition::Start)
    }

    fn query_params(&self, _position: &PagePosition) -> StringMap {
        StringMap::new()
    }
}
