//! HTTP module
//!
//! Everything needed to turn one page request into decoded records.
//!
//! # Features
//!
//! - **Transport**: async `Transport` trait with a reqwest-backed default
//! - **Rate Limiting**: Token bucket rate limiter using governor, served in
//!   arrival order, with a concurrency ceiling
//! - **Retries**: Failure classification and a pure retry policy with
//!   constant, linear and exponential backoff plus jitter
//! - **Page Fetching**: Rate limit, send, classify, decode and retry

mod fetcher;
mod rate_limit;
mod request;
mod retry;
mod transport;

pub use fetcher::{FetchedPage, Page, PageFetcher};
pub use rate_limit::{RateLimiter, RateLimiterConfig, RatePermit};
pub use request::{HttpRequest, HttpResponse, RequestTemplate};
pub use retry::{
    parse_retry_after, FailureKind, RetryConfig, RetryDecision, RetryPolicy, DEFAULT_MAX_ATTEMPTS,
};
pub use transport::{ReqwestTransport, Transport};
