//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::types::{lookup_path, lookup_scalar, JsonValue, StringMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for pagination behavior
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationConfig {
    /// No pagination
    #[default]
    None,

    /// Cursor-based pagination (e.g., Stripe)
    Cursor {
        /// Query parameter name for cursor (e.g., "starting_after")
        cursor_param: String,
        /// Dotted path to the cursor in the response body
        cursor_path: String,
        /// Optional page size parameter name
        #[serde(default)]
        page_size_param: Option<String>,
        /// Page size value
        #[serde(default)]
        page_size: Option<u64>,
        /// Stop condition
        #[serde(default)]
        stop_condition: StopCondition,
    },

    /// Offset-based pagination
    Offset {
        /// Query parameter name for offset
        #[serde(default = "default_offset_param")]
        offset_param: String,
        /// Query parameter name for limit
        #[serde(default = "default_limit_param")]
        limit_param: String,
        /// Number of records per page
        limit: u64,
        /// First offset
        #[serde(default)]
        start_offset: u64,
        /// Stop condition
        #[serde(default)]
        stop_condition: StopCondition,
    },

    /// Page number pagination
    PageNumber {
        /// Query parameter name for page number
        #[serde(default = "default_page_param")]
        page_param: String,
        /// First page number (usually 0 or 1)
        #[serde(default = "default_start_page")]
        start_page: u64,
        /// Optional page size parameter name
        #[serde(default)]
        page_size_param: Option<String>,
        /// Page size value
        #[serde(default)]
        page_size: Option<u64>,
        /// Stop condition
        #[serde(default)]
        stop_condition: StopCondition,
    },

    /// Next URL in response body
    NextUrl {
        /// Dotted path to the next page URL
        next_url_path: String,
        /// Stop condition
        #[serde(default)]
        stop_condition: StopCondition,
    },
}

fn default_offset_param() -> String {
    "offset".to_string()
}

fn default_limit_param() -> String {
    "limit".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_start_page() -> u64 {
    1
}

impl PaginationConfig {
    /// Create cursor pagination config
    pub fn cursor(cursor_param: impl Into<String>, cursor_path: impl Into<String>) -> Self {
        Self::Cursor {
            cursor_param: cursor_param.into(),
            cursor_path: cursor_path.into(),
            page_size_param: None,
            page_size: None,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    /// Create offset pagination config with the default `offset`/`limit` parameter names
    pub fn offset(limit: u64) -> Self {
        Self::Offset {
            offset_param: default_offset_param(),
            limit_param: default_limit_param(),
            limit,
            start_offset: 0,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    /// Create page number pagination config
    pub fn page_number(page_param: impl Into<String>, start_page: u64) -> Self {
        Self::PageNumber {
            page_param: page_param.into(),
            start_page,
            page_size_param: None,
            page_size: None,
            stop_condition: StopCondition::EmptyPage,
        }
    }

    /// Create next URL pagination config
    pub fn next_url(path: impl Into<String>) -> Self {
        Self::NextUrl {
            next_url_path: path.into(),
            stop_condition: StopCondition::EmptyPage,
        }
    }

    /// Set the page size on strategies that take one
    #[must_use]
    pub fn with_page_size(mut self, param: impl Into<String>, size: u64) -> Self {
        match &mut self {
            Self::Cursor {
                page_size_param,
                page_size,
                ..
            }
            | Self::PageNumber {
                page_size_param,
                page_size,
                ..
            } => {
                *page_size_param = Some(param.into());
                *page_size = Some(size);
            }
            Self::Offset {
                limit_param, limit, ..
            } => {
                *limit_param = param.into();
                *limit = size;
            }
            Self::None | Self::NextUrl { .. } => {}
        }
        self
    }

    /// Set the stop condition
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        match &mut self {
            Self::Cursor { stop_condition, .. }
            | Self::Offset { stop_condition, .. }
            | Self::PageNumber { stop_condition, .. }
            | Self::NextUrl { stop_condition, .. } => *stop_condition = condition,
            Self::None => {}
        }
        self
    }

    /// Strategy name for logs
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Cursor { .. } => "cursor",
            Self::Offset { .. } => "offset",
            Self::PageNumber { .. } => "page_number",
            Self::NextUrl { .. } => "next_url",
        }
    }

    /// Validate strategy parameters
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            Self::Offset { limit: 0, .. } => Err(crate::Error::invalid_value(
                "pagination.limit",
                "must be greater than 0",
            )),
            Self::Cursor { page_size: Some(0), .. }
            | Self::PageNumber { page_size: Some(0), .. } => Err(crate::Error::invalid_value(
                "pagination.page_size",
                "must be greater than 0",
            )),
            Self::Cursor { cursor_path, .. } if cursor_path.is_empty() => Err(
                crate::Error::invalid_value("pagination.cursor_path", "must not be empty"),
            ),
            Self::NextUrl { next_url_path, .. } if next_url_path.is_empty() => Err(
                crate::Error::invalid_value("pagination.next_url_path", "must not be empty"),
            ),
            _ => Ok(()),
        }
    }
}

/// Extra stop conditions, checked on top of the empty-page rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopCondition {
    /// Stop when page is empty (no records)
    #[default]
    EmptyPage,

    /// Stop when a field has a specific value
    Field {
        /// Dotted path to the field
        path: String,
        /// Expected value to stop
        value: JsonValue,
    },

    /// Stop when a boolean "more data" flag is false or missing
    HasMore {
        /// Dotted path to the flag
        path: String,
    },

    /// Stop when the rows seen reach a total count hint
    TotalCount {
        /// Dotted path to total count field
        path: String,
    },

    /// Stop when the pages seen reach a total pages hint
    TotalPages {
        /// Dotted path to total pages field
        path: String,
    },
}

impl StopCondition {
    /// Create a field-based stop condition
    pub fn field(path: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::Field {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create a has-more flag stop condition
    pub fn has_more(path: impl Into<String>) -> Self {
        Self::HasMore { path: path.into() }
    }

    /// Create a total count stop condition
    pub fn total_count(path: impl Into<String>) -> Self {
        Self::TotalCount { path: path.into() }
    }

    /// Create a total pages stop condition
    pub fn total_pages(path: impl Into<String>) -> Self {
        Self::TotalPages { path: path.into() }
    }

    /// Fold this condition's hints from `body` into `meta`
    pub fn apply(&self, body: &JsonValue, meta: &mut PageMetadata) {
        match self {
            Self::EmptyPage => {}
            Self::Field { path, value } => {
                if lookup_path(body, path) == Some(value) {
                    meta.stop_signal = true;
                }
            }
            Self::HasMore { path } => {
                let has_more = lookup_path(body, path).and_then(JsonValue::as_bool);
                meta.has_more = has_more;
                if has_more != Some(true) {
                    meta.stop_signal = true;
                }
            }
            Self::TotalCount { path } => {
                meta.total_count = lookup_scalar(body, path).and_then(|s| s.parse().ok());
            }
            Self::TotalPages { path } => {
                meta.total_pages = lookup_scalar(body, path).and_then(|s| s.parse().ok());
            }
        }
    }
}

/// Where a page sits in the source's paging scheme
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PagePosition {
    /// First page of a token-driven strategy, or the only page
    Start,
    /// Opaque cursor token
    Cursor(String),
    /// Record offset
    Offset(u64),
    /// Page number
    Page(u64),
    /// Absolute next-page URL
    Url(String),
}

impl PagePosition {
    /// The token to guard against repeats, for token-driven positions
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Cursor(token) | Self::Url(token) => Some(token),
            _ => None,
        }
    }
}

impl fmt::Display for PagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Cursor(token) => write!(f, "cursor {token}"),
            Self::Offset(offset) => write!(f, "offset {offset}"),
            Self::Page(page) => write!(f, "page {page}"),
            Self::Url(url) => write!(f, "url {url}"),
        }
    }
}

/// Pagination metadata extracted from one page's body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    /// Records decoded from the page
    pub record_count: u64,
    /// Next cursor token, if the body carried a non-empty one
    pub next_token: Option<String>,
    /// Next page URL, if the body carried a non-empty one
    pub next_url: Option<String>,
    /// Has-more flag, if the body carried one
    pub has_more: Option<bool>,
    /// Server said there is nothing after this page
    pub stop_signal: bool,
    /// Total record count hint
    pub total_count: Option<u64>,
    /// Total page count hint
    pub total_pages: Option<u64>,
}

impl PageMetadata {
    /// Metadata carrying only a record count
    pub fn with_count(record_count: u64) -> Self {
        Self {
            record_count,
            ..Default::default()
        }
    }
}

/// A concrete request for one page, before URL rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index within the ingestion
    pub index: u64,
    /// Position in the source's paging scheme
    pub position: PagePosition,
    /// Pagination query parameters
    pub query: StringMap,
    /// URL that replaces the base URL
    pub url: Option<String>,
}

/// Core trait for pagination strategies.
///
/// Strategies are stateless: the cursor owns all state and passes the current
/// position in.
pub trait Paginator: Send + Sync + fmt::Debug {
    /// Position of the first page
    fn initial(&self) -> PagePosition;

    /// Extract pagination metadata from a decoded body
    fn metadata(&self, body: &JsonValue, record_count: u64) -> PageMetadata;

    /// Position after `current`, or `None` when the strategy says the source is done
    fn next(&self, current: &PagePosition, meta: &PageMetadata) -> Option<PagePosition>;

    /// Position of page `index` without seeing earlier pages, when the
    /// strategy can compute it
    fn predict(&self, _index: u64) -> Option<PagePosition> {
        None
    }

    /// Query parameters for a position
    fn query_params(&self, position: &PagePosition) -> StringMap;

    /// Build the request for a page
    fn request(&self, index: u64, position: PagePosition) -> PageRequest {
        PageRequest {
            index,
            query: self.query_params(&position),
            url: match &position {
                PagePosition::Url(url) => Some(url.clone()),
                _ => None,
            },
            position,
        }
    }
}
