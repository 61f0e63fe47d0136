//! Per-client rate limiting using the token bucket algorithm.
//!
//! Uses the Governor crate, which implements the Generic Cell Rate Algorithm
//! (a "leaky bucket as a meter"). Each client IP gets its own bucket with
//! `burst` capacity, refilled at `rps` tokens per second, so one abusive
//! client cannot starve the rest.
//!
//! Buckets live in an in-process map. A background sweep (see
//! [`AppState`](crate::state::AppState)) evicts buckets idle long enough to
//! have fully refilled, keeping memory bounded.
//!
//! # Response Headers
//!
//! On rate limit exceeded (429):
//! - `Retry-After`: Seconds until the next request will be accepted
//! - `X-RateLimit-Limit`: Configured RPS limit
//! - `X-RateLimit-Remaining`: Remaining requests in the current window

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response};
use axum::response::IntoResponse;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tower::{Layer, Service};
use tracing::warn;

use super::ip::extract_client_ip;
use crate::error::AppError;

/// Error type for rate limit layer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// RPS value cannot be zero.
    ZeroRps,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroRps => {
                write!(f, "RPS must be greater than 0; omit the layer to disable")
            }
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Per-IP rate limiter keyed by client IP string.
pub type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting layer for the Tower middleware stack.
///
/// The limiter map is shared between the layer and the background sweep
/// task, so cloning the layer never resets anyone's bucket.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<KeyedLimiter>,
    /// Configured RPS limit, reported in the X-RateLimit-Limit header.
    limit: u32,
}

impl RateLimitLayer {
    /// Create a new per-IP rate limit layer.
    ///
    /// `rps` is the sustained per-client rate; `burst` is the bucket
    /// capacity (a burst of 0 is clamped to 1).
    ///
    /// # Errors
    ///
    /// Returns `RateLimitError::ZeroRps` if `rps` is 0. When rate limiting
    /// is disabled, don't install the layer at all.
    pub fn new(rps: u32, burst: u32) -> Result<Self, RateLimitError> {
        let rps_nonzero = NonZeroU32::new(rps).ok_or(RateLimitError::ZeroRps)?;

        let burst_nonzero = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);

        let quota = Quota::per_second(rps_nonzero).allow_burst(burst_nonzero);
        let limiter = RateLimiter::keyed(quota);

        Ok(Self {
            limiter: Arc::new(limiter),
            limit: rps,
        })
    }

    /// Shared handle to the bucket map, for the idle-bucket sweep task.
    pub fn limiter(&self) -> Arc<KeyedLimiter> {
        self.limiter.clone()
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            limit: self.limit,
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<KeyedLimiter>,
    limit: u32,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let limit = self.limit;
        let mut inner = self.inner.clone();

        // Governor's keyed limiter needs an owned key.
        let client_ip = extract_client_ip(&req).into_owned();

        Box::pin(async move {
            match limiter.check_key(&client_ip) {
                Ok(_) => inner.call(req).await,
                Err(not_until) => {
                    let wait_time = not_until.wait_time_from(DefaultClock::default().now());
                    let retry_after = wait_time.as_secs().max(1);

                    warn!(
                        client_ip = %client_ip,
                        path = %req.uri().path(),
                        retry_after_secs = retry_after,
                        "Request rejected by rate limiter"
                    );
                    crate::metrics::record_rate_limit_rejection();

                    let mut response = AppError::RateLimited {
                        retry_after_secs: retry_after,
                    }
                    .into_response();

                    if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                        response.headers_mut().insert("X-RateLimit-Limit", value);
                    }
                    response
                        .headers_mut()
                        .insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));

                    Ok(response)
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_layer_creation() {
        let layer = RateLimitLayer::new(100, 50).unwrap();
        assert_eq!(layer.limit, 100);
    }

    #[test]
    fn test_zero_rps_returns_error() {
        let result = RateLimitLayer::new(0, 50);
        assert!(matches!(result, Err(RateLimitError::ZeroRps)));
    }

    #[test]
    fn test_zero_burst_is_clamped() {
        // A burst of 0 still allows one request through.
        let layer = RateLimitLayer::new(1, 0).unwrap();
        assert!(layer.limiter.check_key(&"1.2.3.4".to_string()).is_ok());
    }

    #[test]
    fn test_burst_admits_then_rejects() {
        let layer = RateLimitLayer::new(1, 3).unwrap();
        let key = "10.0.0.1".to_string();

        for _ in 0..3 {
            assert!(layer.limiter.check_key(&key).is_ok());
        }
        assert!(layer.limiter.check_key(&key).is_err());
    }

    #[test]
    fn test_buckets_are_independent_per_key() {
        let layer = RateLimitLayer::new(1, 1).unwrap();

        assert!(layer.limiter.check_key(&"10.0.0.1".to_string()).is_ok());
        assert!(layer.limiter.check_key(&"10.0.0.1".to_string()).is_err());
        // A different client still has a full bucket.
        assert!(layer.limiter.check_key(&"10.0.0.2".to_string()).is_ok());
    }
}
