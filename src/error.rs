//! Error types for rest-ingest
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Transient kinds (`Transport`, `RateLimitExceeded`, `ServerError`) are
//! absorbed by the page fetcher while retries remain. Everything that reaches
//! the ingestion engine is terminal and is reported wrapped in
//! [`Error::Aborted`] together with the number of rows already produced.

use thiserror::Error;

/// The main error type for rest-ingest
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Fetch Errors
    // ============================================================================
    #[error("Transport error ({kind}): {message}")]
    Transport {
        message: String,
        kind: TransportErrorKind,
    },

    #[error("Rate limited by server (HTTP {status})")]
    RateLimitExceeded {
        status: u16,
        retry_after_ms: Option<u64>,
    },

    #[error("Server error HTTP {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Client error HTTP {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<Error> },

    // ============================================================================
    // Ingestion Errors
    // ============================================================================
    #[error("Schema conflict on column '{column}': {message}")]
    SchemaConflict { column: String, message: String },

    #[error("Pagination loop detected at page {page_index}: token '{token}' repeated")]
    PaginationLoop { page_index: u64, token: String },

    #[error("Ingestion timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error("Ingestion aborted after {rows_produced} rows: {source}")]
    Aborted {
        rows_produced: u64,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a transient connection error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            kind: TransportErrorKind::Connect,
        }
    }

    /// Create a per-request timeout error
    pub fn request_timeout(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            kind: TransportErrorKind::Timeout,
        }
    }

    /// Create a transport error that retrying cannot fix
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            kind: TransportErrorKind::Fatal,
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a schema conflict error
    pub fn schema_conflict(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaConflict {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Classify an HTTP status into the matching error kind.
    ///
    /// Returns `None` for success statuses.
    pub fn from_status(
        status: u16,
        body: impl Into<String>,
        retry_after_ms: Option<u64>,
    ) -> Option<Self> {
        match status {
            200..=399 => None,
            429 => Some(Self::RateLimitExceeded {
                status,
                retry_after_ms,
            }),
            400..=499 => Some(Self::ClientError {
                status,
                body: body.into(),
            }),
            _ => Some(Self::ServerError {
                status,
                body: body.into(),
            }),
        }
    }

    /// Wrap a terminal error with the number of rows produced before it
    pub fn aborted(rows_produced: u64, source: Error) -> Self {
        match source {
            already @ Self::Aborted { .. } => already,
            other => Self::Aborted {
                rows_produced,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, looking through `Aborted` and `RetriesExhausted`
    pub fn root(&self) -> &Error {
        match self {
            Self::Aborted { source, .. } => source.root(),
            Self::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// Rows produced before the failure, if this is an abort
    pub fn rows_produced(&self) -> Option<u64> {
        match self {
            Self::Aborted { rows_produced, .. } => Some(*rows_produced),
            _ => None,
        }
    }

    /// Check if this error is one of the transient kinds
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport { kind, .. } => *kind != TransportErrorKind::Fatal,
            Error::RateLimitExceeded { .. } | Error::ServerError { .. } => true,
            _ => false,
        }
    }
}

/// How a transport failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, reset or dropped mid-response
    Connect,
    /// The request did not complete within its timeout
    Timeout,
    /// The request could not be sent at all (bad request, TLS setup, ...)
    Fatal,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportErrorKind::Connect => write!(f, "connect"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Result type alias for rest-ingest
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::from_status(404, "Not found", None).unwrap();
        assert_eq!(err.to_string(), "Client error HTTP 404: Not found");

        let err = Error::aborted(7, Error::Cancelled);
        assert_eq!(
            err.to_string(),
            "Ingestion aborted after 7 rows: Ingestion cancelled"
        );
    }

    #[test]
    fn test_from_status() {
        assert!(Error::from_status(200, "", None).is_none());
        assert!(Error::from_status(304, "", None).is_none());
        assert!(matches!(
            Error::from_status(429, "", Some(1000)),
            Some(Error::RateLimitExceeded {
                retry_after_ms: Some(1000),
                ..
            })
        ));
        assert!(matches!(
            Error::from_status(401, "", None),
            Some(Error::ClientError { status: 401, .. })
        ));
        assert!(matches!(
            Error::from_status(503, "", None),
            Some(Error::ServerError { status: 503, .. })
        ));
    }

    #[test]
    fn test_is_transient() {
        assert!(Error::transport("reset").is_transient());
        assert!(Error::request_timeout("slow").is_transient());
        assert!(Error::from_status(500, "", None).unwrap().is_transient());
        assert!(Error::from_status(429, "", None).unwrap().is_transient());

        assert!(!Error::from_status(400, "", None).unwrap().is_transient());
        assert!(!Error::malformed("bad json").is_transient());
        assert!(!Error::config("test").is_transient());
        assert!(!Error::transport_fatal("builder").is_transient());
    }

    #[test]
    fn test_aborted_does_not_nest() {
        let inner = Error::aborted(3, Error::Cancelled);
        let outer = Error::aborted(10, inner);
        assert_eq!(outer.rows_produced(), Some(3));
        assert!(matches!(outer.root(), Error::Cancelled));
    }

    #[test]
    fn test_root_looks_through_retries() {
        let err = Error::aborted(
            0,
            Error::RetriesExhausted {
                attempts: 5,
                last: Box::new(Error::from_status(502, "bad gateway", None).unwrap()),
            },
        );
        assert!(matches!(err.root(), Error::ServerError { status: 502, .. }));
    }
}
