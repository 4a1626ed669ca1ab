//! Rate limiting implementation
//!
//! Uses the governor crate for token bucket rate limiting. Waiters queue on a
//! fair mutex in front of the bucket, and a semaphore caps requests in flight.

use crate::error::{Error, Result};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per second
    pub requests_per_second: u32,
    /// Burst size (max tokens in bucket)
    #[serde(alias = "burst")]
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 10,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    /// Create config for high throughput (100 rps)
    pub fn high_throughput() -> Self {
        Self {
            requests_per_second: 100,
            burst_size: 100,
        }
    }

    /// Create config for low throughput (1 rps)
    pub fn low_throughput() -> Self {
        Self {
            requests_per_second: 1,
            burst_size: 1,
        }
    }
}

type DirectLimiter = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Permission to send one request. Holds a concurrency slot until dropped.
#[derive(Debug)]
pub struct RatePermit {
    _slot: OwnedSemaphorePermit,
}

/// Token bucket rate limiter with a concurrency ceiling
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Option<Arc<DirectLimiter>>,
    queue: Arc<Mutex<()>>,
    slots: Arc<Semaphore>,
    max_concurrency: usize,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig, max_concurrency: usize) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Some(Arc::new(Governor::direct(quota))),
            ..Self::unlimited(max_concurrency)
        }
    }

    /// A limiter that only enforces the concurrency ceiling
    pub fn unlimited(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            limiter: None,
            queue: Arc::new(Mutex::new(())),
            slots: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    /// Wait until a request may be sent.
    ///
    /// Callers are served in arrival order, first for a concurrency slot and
    /// then for a token.
    pub async fn acquire(&self) -> Result<RatePermit> {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| Error::Cancelled)?;

        if let Some(limiter) = &self.limiter {
            let _turn = self.queue.lock().await;
            limiter.until_ready().await;
        }

        Ok(RatePermit { _slot: slot })
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> Option<RatePermit> {
        let slot = Arc::clone(&self.slots).try_acquire_owned().ok()?;
        if let Some(limiter) = &self.limiter {
            limiter.check().ok()?;
        }
        Some(RatePermit { _slot: slot })
    }

    /// Free concurrency slots right now
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Check if a token bucket is configured
    pub fn is_rate_limited(&self) -> bool {
        self.limiter.is_some()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate_limited", &self.limiter.is_some())
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}
