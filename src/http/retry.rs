//! Retry policy
//!
//! Classifies failures and decides whether, and after how long, a failed
//! request is tried again. The policy itself never sleeps; the fetch loop
//! does.

use crate::error::{Error, TransportErrorKind};
use crate::types::BackoffType;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default attempt cap, first attempt included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per page, first attempt included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound for computed delays
    pub max_delay_ms: u64,
    /// Type of backoff strategy
    pub backoff: BackoffType,
    /// Randomize computed delays between zero and the backoff ceiling
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 200,
            max_delay_ms: 30_000,
            backoff: BackoffType::Exponential,
            jitter: true,
        }
    }
}

/// What kind of failure a request hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection reset, refused or timed out
    TransientNetwork,
    /// HTTP 429, with the server's requested delay if it sent one
    RateLimited { retry_after: Option<Duration> },
    /// HTTP 5xx
    ServerError,
    /// HTTP 4xx other than 429
    ClientError,
    /// Body did not parse
    MalformedResponse,
    /// Anything else
    Fatal,
}

impl FailureKind {
    /// Classify an error returned by a fetch attempt
    pub fn classify(error: &Error) -> Self {
        match error {
            Error::Transport { kind, .. } => match kind {
                TransportErrorKind::Connect | TransportErrorKind::Timeout => {
                    Self::TransientNetwork
                }
                TransportErrorKind::Fatal => Self::Fatal,
            },
            Error::RateLimitExceeded { retry_after_ms, .. } => Self::RateLimited {
                retry_after: retry_after_ms.map(Duration::from_millis),
            },
            Error::ServerError { .. } => Self::ServerError,
            Error::ClientError { .. } => Self::ClientError,
            Error::MalformedResponse { .. } => Self::MalformedResponse,
            _ => Self::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork | Self::RateLimited { .. } | Self::ServerError
        )
    }
}

/// Outcome of consulting the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The failure is terminal for this page
    GiveUp,
    /// Try again after `delay`
    Retry { delay: Duration },
}

/// Pure retry decision function
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::new(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed
    pub fn should_retry(&self, attempt: u32, failure: &FailureKind) -> RetryDecision {
        if !failure.is_retryable() || attempt >= self.config.max_attempts {
            return RetryDecision::GiveUp;
        }

        let delay = match failure {
            FailureKind::RateLimited {
                retry_after: Some(hint),
            } => *hint,
            _ => self.jittered(self.backoff_ceiling(attempt)),
        };
        RetryDecision::Retry { delay }
    }

    /// Deterministic delay bound after attempt number `attempt` failed
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let base = Duration::from_millis(self.config.base_delay_ms);
        let max = Duration::from_millis(self.config.max_delay_ms);
        let attempt = attempt.max(1);

        let delay = match self.config.backoff {
            BackoffType::Constant => base,
            BackoffType::Linear => base.saturating_mul(attempt),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                base.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, max)
    }

    fn jittered(&self, ceiling: Duration) -> Duration {
        if !self.config.jitter || ceiling.is_zero() {
            return ceiling;
        }
        let nanos = u64::try_from(ceiling.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(rand::thread_rng().gen_range(0..=nanos))
    }
}

/// Parse a `Retry-After` header: delay seconds or an HTTP date
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = date.with_timezone(&Utc) - Utc::now();
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}
