//! In-memory transport for unit tests

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::JsonValue;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type Handler = dyn Fn(&HttpRequest, u32) -> Result<HttpResponse> + Send + Sync;

/// Answers requests from a closure and records every request it sees.
///
/// The closure gets the request and how many times this exact URL has been
/// requested before.
pub(crate) struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
    calls: Mutex<HashMap<String, u32>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub(crate) fn new(
        handler: impl Fn(&HttpRequest, u32) -> Result<HttpResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
            delay: None,
        }
    }

    /// Serve JSON pages selected by a query parameter's value.
    /// Values with no page get an empty array.
    pub(crate) fn paged(param: &'static str, pages: Vec<(&'static str, JsonValue)>) -> Self {
        Self::new(move |request, _| {
            let value = query_value(request, param).unwrap_or_default();
            let body = pages
                .iter()
                .find(|(key, _)| *key == value)
                .map_or_else(|| "[]".to_string(), |(_, page)| page.to_string());
            Ok(HttpResponse::new(200, body))
        })
    }

    /// Delay every response, longest for the earliest requests, so that
    /// concurrent requests complete out of order
    #[must_use]
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

/// Value of a query parameter on a request URL
pub(crate) fn query_value(request: &HttpRequest, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let seen = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(request.url.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };
        let position = self.requests.lock().unwrap().len() as u32;
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            // Earlier requests wait longer
            let factor = 8u32.saturating_sub(position).max(1);
            tokio::time::sleep(delay * factor).await;
        }

        (self.handler)(&request, seen)
    }
}
