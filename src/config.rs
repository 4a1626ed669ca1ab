//! Ingestion configuration
//!
//! One [`IngestConfig`] describes one paginated endpoint and how to ingest
//! it. Configs load from YAML or JSON and can also be built in code.

use crate::error::{Error, Result};
use crate::http::{RateLimiterConfig, RequestTemplate, RetryConfig};
use crate::pagination::{PaginationConfig, DEFAULT_REPEAT_WINDOW};
use crate::schema::DEFAULT_SEPARATOR;
use crate::types::{JsonValue, Method, SchemaMode, StringMap};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Highest accepted `concurrency`
pub const MAX_CONCURRENCY: usize = 16;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete ingestion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Endpoint URL, optionally with query parameters
    pub base_url: String,

    /// HTTP method
    #[serde(default)]
    pub method: Method,

    /// Static query parameters sent with every page
    #[serde(default)]
    pub query: StringMap,

    /// Headers sent with every page
    #[serde(default)]
    pub headers: StringMap,

    /// JSON body, sent with POST
    #[serde(default)]
    pub body: Option<JsonValue>,

    /// Dotted path to the record array (`data.items`, `$.results`, `data.0`);
    /// the body root when unset.
    ///
    /// Only plain object keys and array indexes are supported. JSONPath
    /// wildcards, filters and recursive descent are rejected by `validate`.
    #[serde(default)]
    pub records_path: Option<String>,

    /// Pagination strategy
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Maximum number of page requests
    #[serde(default)]
    pub max_pages: Option<u64>,

    /// Maximum number of rows produced
    #[serde(default)]
    pub max_rows: Option<u64>,

    /// Page requests in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Client-side rate limit; `null` disables it
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Retry behavior
    #[serde(default)]
    pub retry: RetryConfig,

    /// When rows are projected and emitted
    #[serde(default)]
    pub schema_mode: SchemaMode,

    /// Flatten nested objects into path-qualified columns
    #[serde(default)]
    pub flatten_nested: bool,

    /// Separator for flattened column names
    #[serde(default = "default_separator")]
    pub flatten_separator: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Whole-ingestion timeout
    #[serde(default)]
    pub ingest_timeout_ms: Option<u64>,

    /// Recent cursor tokens checked for repeats
    #[serde(default = "default_repeat_window")]
    pub repeat_window: usize,
}

fn default_concurrency() -> usize {
    1
}

#[allow(clippy::unnecessary_wraps)]
fn default_rate_limit() -> Option<RateLimiterConfig> {
    Some(RateLimiterConfig::default())
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_repeat_window() -> usize {
    DEFAULT_REPEAT_WINDOW
}

impl IngestConfig {
    /// Create a config for a URL with every other setting at its default
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            method: Method::default(),
            query: StringMap::new(),
            headers: StringMap::new(),
            body: None,
            records_path: None,
            pagination: PaginationConfig::default(),
            max_pages: None,
            max_rows: None,
            concurrency: default_concurrency(),
            rate_limit: default_rate_limit(),
            retry: RetryConfig::default(),
            schema_mode: SchemaMode::default(),
            flatten_nested: false,
            flatten_separator: default_separator(),
            request_timeout_ms: default_request_timeout_ms(),
            ingest_timeout_ms: None,
            repeat_window: default_repeat_window(),
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load and validate a config from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; `.json` files parse as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Check the config for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::config("base_url cannot be empty"));
        }
        url::Url::parse(&self.base_url)?;

        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(Error::invalid_value(
                "concurrency",
                format!("must be between 1 and {MAX_CONCURRENCY}"),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::invalid_value("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::invalid_value(
                "retry.base_delay_ms",
                "must not exceed retry.max_delay_ms",
            ));
        }
        if let Some(rate_limit) = &self.rate_limit {
            if rate_limit.requests_per_second == 0 {
                return Err(Error::invalid_value(
                    "rate_limit.requests_per_second",
                    "must be greater than 0",
                ));
            }
        }
        if self.flatten_nested && self.flatten_separator.is_empty() {
            return Err(Error::invalid_value("flatten_separator", "cannot be empty"));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::invalid_value("request_timeout_ms", "must be greater than 0"));
        }
        if self.repeat_window == 0 {
            return Err(Error::invalid_value("repeat_window", "must be at least 1"));
        }
        if let Some(path) = &self.records_path {
            if path.contains(['*', '[', '?']) || path.contains("..") {
                return Err(Error::invalid_value(
                    "records_path",
                    "only dotted key paths are supported",
                ));
            }
        }
        if self.body.is_some() && self.method == Method::GET {
            return Err(Error::invalid_value("body", "only allowed with POST"));
        }

        self.pagination.validate()
    }

    // ========================================================================
    // Derived Values
    // ========================================================================

    /// The request parts shared by every page
    pub fn request_template(&self) -> Result<RequestTemplate> {
        let mut template = RequestTemplate::new(&self.base_url)?;
        template.method = self.method;
        template.query.clone_from(&self.query);
        template.headers.clone_from(&self.headers);
        template.body.clone_from(&self.body);
        template.timeout = Some(self.request_timeout());
        Ok(template)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn ingest_timeout(&self) -> Option<Duration> {
        self.ingest_timeout_ms.map(Duration::from_millis)
    }

    // ========================================================================
    // Builder Methods
    // ========================================================================

    /// Set the HTTP method
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Send a JSON body with POST
    #[must_use]
    pub fn with_post_body(mut self, body: JsonValue) -> Self {
        self.method = Method::POST;
        self.body = Some(body);
        self
    }

    /// Add a static query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the record path
    #[must_use]
    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = Some(path.into());
        self
    }

    /// Set the pagination strategy
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Cap the number of page requests
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Cap the number of rows
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Set the number of page requests in flight
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the client-side rate limit
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimiterConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Disable client-side rate limiting
    #[must_use]
    pub fn without_rate_limit(mut self) -> Self {
        self.rate_limit = None;
        self
    }

    /// Set retry behavior
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the schema mode
    #[must_use]
    pub fn with_schema_mode(mut self, mode: SchemaMode) -> Self {
        self.schema_mode = mode;
        self
    }

    /// Flatten nested objects with a separator
    #[must_use]
    pub fn with_flattening(mut self, separator: impl Into<String>) -> Self {
        self.flatten_nested = true;
        self.flatten_separator = separator.into();
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the whole-ingestion timeout
    #[must_use]
    pub fn with_ingest_timeout(mut self, timeout: Duration) -> Self {
        self.ingest_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}
