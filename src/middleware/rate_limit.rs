//! Rate limiting stage over a pluggable limiter.
//!
//! # Algorithm
//!
//! The stage itself is algorithm-agnostic: it asks a [`Limiter`] for a
//! [`RateLimitResult`] snapshot keyed by an application-supplied function
//! (client IP by default). [`WindowLimiter`] is the bundled limiter, built on
//! the Governor crate's GCRA ("leaky bucket as a meter"):
//!
//! - `max_attempts` cells replenished evenly over `window`
//! - Per-key state, thread-safe, increments serialized per key by Governor
//!
//! # Response Headers
//!
//! On rejection (429, unless a custom rejection handler is set):
//! - `X-RateLimit-Limit`: current + remaining attempts
//! - `X-RateLimit-Remaining`: remaining attempts
//! - `X-RateLimit-Reset`: epoch seconds of the next allowed attempt (0 if unknown)
//! - `Retry-After`: seconds until the next allowed attempt (at least 1)
//!
//! On allowed requests the inner response gains `X-RateLimit-Remaining`.
//!
//! # IP Spoofing
//!
//! The default key trusts proxy headers; see [`ip`](super::ip).

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use super::ip::extract_client_ip;
use crate::error::{AppResult, DEFAULT_RETRY_AFTER_SECS, retry_delay_secs};
use crate::headers::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use crate::metrics;
use crate::pipeline::{BoxFuture, Middleware, Next};

/// Decision snapshot for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub is_allowed: bool,
    pub current_attempts: u32,
    pub remaining_attempts: u32,
    pub next_allowed_attempt: Option<DateTime<Utc>>,
}

impl RateLimitResult {
    /// Total attempts in the window, as advertised in `X-RateLimit-Limit`.
    pub fn limit(&self) -> u32 {
        self.current_attempts.saturating_add(self.remaining_attempts)
    }

    /// Epoch seconds of the next allowed attempt, or 0 if unknown.
    pub fn reset_epoch_secs(&self) -> i64 {
        self.next_allowed_attempt.map_or(0, |at| at.timestamp())
    }
}

/// Capability consulted once per request.
///
/// Implementations own their state and must serialize updates per key.
pub trait Limiter: Send + Sync + 'static {
    fn check_limit<'a>(&'a self, key: &'a str) -> BoxFuture<'a, RateLimitResult>;
}

type KeyedLimiter = RateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    DefaultClock,
    StateInformationMiddleware,
>;

const MIN_PRUNE_INTERVAL: Duration = Duration::from_millis(10);

/// Error type for limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("max attempts must be greater than 0")]
    ZeroAttempts,

    #[error("window must be long enough to replenish at least one attempt")]
    ZeroWindow,
}

/// Governor-backed keyed limiter allowing `max_attempts` per `window`.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = WindowLimiter::new(5, Duration::from_secs(60))?;
/// app.middleware(RateLimiting::new(limiter));
/// ```
pub struct WindowLimiter {
    limiter: KeyedLimiter,
    max_attempts: u32,
}

impl WindowLimiter {
    /// # Errors
    ///
    /// Returns `RateLimitError` if `max_attempts` is 0 or `window / max_attempts`
    /// rounds down to zero.
    pub fn new(max_attempts: u32, window: Duration) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(max_attempts).ok_or(RateLimitError::ZeroAttempts)?;
        let quota = Quota::with_period(window / max_attempts)
            .ok_or(RateLimitError::ZeroWindow)?
            .allow_burst(burst);

        let limiter = RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>();

        Ok(Self {
            limiter,
            max_attempts,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    /// Drop state for keys that are back at full capacity.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }

    /// Spawn a background task calling [`retain_recent`](Self::retain_recent)
    /// every `every`.
    ///
    /// The task holds a weak reference and exits once the limiter is dropped.
    /// Returns `None` when called outside a Tokio runtime.
    pub fn spawn_pruning(self: &Arc<Self>, every: Duration) -> Option<JoinHandle<()>> {
        let runtime = Handle::try_current().ok()?;
        let limiter = Arc::downgrade(self);
        let every = every.max(MIN_PRUNE_INTERVAL);

        Some(runtime.spawn(async move {
            let mut ticker = interval(every);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };

                let before = limiter.tracked_keys();
                limiter.retain_recent();
                let after = limiter.tracked_keys();
                debug!(
                    pruned = before.saturating_sub(after),
                    tracked = after,
                    "Pruned rate limiter state"
                );
            }

            debug!("Rate limiter pruning task shutting down");
        }))
    }

    fn decide(&self, key: &str) -> RateLimitResult {
        match self.limiter.check_key(&key.to_string()) {
            Ok(snapshot) => {
                let remaining = snapshot.remaining_burst_capacity();
                RateLimitResult {
                    is_allowed: true,
                    current_attempts: self.max_attempts.saturating_sub(remaining),
                    remaining_attempts: remaining,
                    next_allowed_attempt: None,
                }
            }
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                let next_allowed = chrono::Duration::from_std(wait)
                    .ok()
                    .map(|delay| Utc::now() + delay);
                RateLimitResult {
                    is_allowed: false,
                    current_attempts: self.max_attempts,
                    remaining_attempts: 0,
                    next_allowed_attempt: next_allowed,
                }
            }
        }
    }
}

impl Limiter for WindowLimiter {
    fn check_limit<'a>(&'a self, key: &'a str) -> BoxFuture<'a, RateLimitResult> {
        Box::pin(async move { self.decide(key) })
    }
}

/// Extracts the limiter key from a request.
pub type KeyFn = Arc<dyn Fn(&Request) -> AppResult<String> + Send + Sync>;

/// Builds the response for a rejected request.
pub type RejectFn = Arc<dyn Fn(&Request, &RateLimitResult) -> AppResult<Response> + Send + Sync>;

/// Pipeline stage enforcing a [`Limiter`].
pub struct RateLimiting {
    limiter: Arc<dyn Limiter>,
    key: KeyFn,
    on_rejected: Option<RejectFn>,
}

impl RateLimiting {
    /// Limit by client IP with the default 429 response.
    pub fn new<L: Limiter>(limiter: L) -> Self {
        Self::shared(Arc::new(limiter))
    }

    pub fn shared(limiter: Arc<dyn Limiter>) -> Self {
        Self {
            limiter,
            key: Arc::new(|request: &Request| Ok(extract_client_ip(request).into_owned())),
            on_rejected: None,
        }
    }

    /// Replace the key extraction function.
    pub fn key_by<F>(mut self, key: F) -> Self
    where
        F: Fn(&Request) -> AppResult<String> + Send + Sync + 'static,
    {
        self.key = Arc::new(key);
        self
    }

    /// Replace the default 429 response.
    pub fn on_rejected<F>(mut self, on_rejected: F) -> Self
    where
        F: Fn(&Request, &RateLimitResult) -> AppResult<Response> + Send + Sync + 'static,
    {
        self.on_rejected = Some(Arc::new(on_rejected));
        self
    }
}

/// Default rejection: 429 with quota headers and `Retry-After`.
pub fn too_many_requests(result: &RateLimitResult) -> Response {
    let retry_after = retry_delay_secs(result.next_allowed_attempt, DEFAULT_RETRY_AFTER_SECS);

    let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(result.limit()));
    headers.insert(
        X_RATELIMIT_REMAINING,
        HeaderValue::from(result.remaining_attempts),
    );
    headers.insert(
        X_RATELIMIT_RESET,
        HeaderValue::from(result.reset_epoch_secs()),
    );
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

impl Middleware for RateLimiting {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            let key = (self.key)(&request)?;
            let result = self.limiter.check_limit(&key).await;

            if !result.is_allowed {
                warn!(
                    key = %key,
                    path = %request.uri().path(),
                    next_allowed = ?result.next_allowed_attempt,
                    "Rate limit exceeded"
                );
                metrics::record_rate_limit_rejection();

                return match &self.on_rejected {
                    Some(on_rejected) => on_rejected(&request, &result),
                    None => Ok(too_many_requests(&result)),
                };
            }

            debug!(key = %key, remaining = result.remaining_attempts, "Rate limit check passed");
            let mut response = next.run(request).await?;
            response.headers_mut().insert(
                X_RATELIMIT_REMAINING,
                HeaderValue::from(result.remaining_attempts),
            );
            Ok(response)
        })
    }
}
