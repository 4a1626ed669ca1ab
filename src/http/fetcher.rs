//! Page fetcher
//!
//! Executes one page request end to end: rate limit, send, status check,
//! decode and metadata extraction, retrying transient failures.

use super::rate_limit::RateLimiter;
use super::request::HttpRequest;
use super::retry::{FailureKind, RetryDecision, RetryPolicy};
use super::transport::Transport;
use crate::decode::PageDecoder;
use crate::error::{Error, Result};
use crate::pagination::{PageMetadata, Paginator};
use crate::record::Record;
use std::sync::Arc;
use tracing::{debug, warn};

/// Records and pagination metadata of one decoded response
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub metadata: PageMetadata,
}

impl Page {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A page and the number of attempts it took
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub page: Page,
    pub attempts: u32,
}

/// Fetches and decodes single pages
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    decoder: PageDecoder,
    paginator: Arc<dyn Paginator>,
}

impl PageFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        decoder: PageDecoder,
        paginator: Arc<dyn Paginator>,
    ) -> Self {
        Self {
            transport,
            limiter,
            retry,
            decoder,
            paginator,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch one page, retrying transient failures.
    ///
    /// Returns the last error unchanged when it is not retryable, or wrapped
    /// in [`Error::RetriesExhausted`] when retries ran out.
    pub async fn fetch(&self, request: &HttpRequest) -> Result<FetchedPage> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.attempt(request).await {
                Ok(page) => {
                    debug!(
                        url = %request.url,
                        records = page.records.len(),
                        attempt,
                        "Fetched page"
                    );
                    return Ok(FetchedPage {
                        page,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            let failure = FailureKind::classify(&error);
            match self.retry.should_retry(attempt, &failure) {
                RetryDecision::Retry { delay } => {
                    warn!(
                        url = %request.url,
                        attempt,
                        max_attempts = self.retry.max_attempts(),
                        ?delay,
                        error = %error,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp if failure.is_retryable() && attempt > 1 => {
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(error),
                    });
                }
                RetryDecision::GiveUp => return Err(error),
            }
        }
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<Page> {
        let permit = self.limiter.acquire().await?;

        let send = self.transport.send(request.clone());
        let response = match request.timeout {
            Some(timeout) => tokio::time::timeout(timeout, send).await.map_err(|_| {
                Error::request_timeout(format!("no response within {}ms", timeout.as_millis()))
            })??,
            None => send.await?,
        };
        drop(permit);

        if let Some(error) = response.error_for_status() {
            return Err(error);
        }

        let (body, records) = self.decoder.decode(&response.body)?;
        let metadata = self.paginator.metadata(&body, records.len() as u64);
        Ok(Page { records, metadata })
    }
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .field("decoder", &self.decoder)
            .field("paginator", &self.paginator)
            .finish_non_exhaustive()
    }
}
