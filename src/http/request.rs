//! Request and response values exchanged with a transport

use super::retry::parse_retry_after;
use crate::error::{Error, Result};
use crate::pagination::PageRequest;
use crate::types::{JsonValue, Method, StringMap};
use std::time::Duration;
use url::Url;

/// A fully rendered HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: StringMap,
    /// JSON body, sent with POST
    pub body: Option<JsonValue>,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Create a GET request
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: StringMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A received HTTP response with its body read to text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: StringMap,
    pub body: String,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: StringMap::new(),
            body: body.into(),
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(key.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Delay requested by a `Retry-After` header
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after").and_then(parse_retry_after)
    }

    /// The error this response's status maps to, if it is not a success
    #[allow(clippy::cast_possible_truncation)]
    pub fn error_for_status(&self) -> Option<Error> {
        let retry_after_ms = self.retry_after().map(|d| d.as_millis() as u64);
        Error::from_status(self.status, truncate_body(&self.body), retry_after_ms)
    }
}

/// Cap error bodies kept in errors and logs
fn truncate_body(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// The parts of a request that are the same for every page
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub method: Method,
    pub base_url: Url,
    /// Static query parameters
    pub query: StringMap,
    pub headers: StringMap,
    pub body: Option<JsonValue>,
    pub timeout: Option<Duration>,
}

impl RequestTemplate {
    /// Create a GET template for a base URL
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            method: Method::GET,
            base_url: Url::parse(base_url)?,
            query: StringMap::new(),
            headers: StringMap::new(),
            body: None,
            timeout: None,
        })
    }

    /// Render the request for one page.
    ///
    /// Query parameters are merged in order: those already on the base URL,
    /// then the static ones, then the page's; later values replace earlier
    /// ones with the same key. A next-page URL from the server is used as is.
    pub fn render(&self, page: &PageRequest) -> Result<HttpRequest> {
        let url = match &page.url {
            Some(next) => self.base_url.join(next)?,
            None => {
                let mut url = self.base_url.clone();
                let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
                for (key, value) in self.query.iter().chain(page.query.iter()) {
                    match pairs.iter_mut().find(|(existing, _)| existing == key) {
                        Some(pair) => pair.1.clone_from(value),
                        None => pairs.push((key.clone(), value.clone())),
                    }
                }
                url.set_query(None);
                if !pairs.is_empty() {
                    url.query_pairs_mut().extend_pairs(pairs);
                }
                url
            }
        };

        Ok(HttpRequest {
            method: self.method,
            url,
            headers: self.headers.clone(),
            body: match self.method {
                Method::POST => self.body.clone(),
                Method::GET => None,
            },
            timeout: self.timeout,
        })
    }
}
