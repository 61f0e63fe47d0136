//! Client IP extraction for per-client rate limiting.
//!
//! The forwarding headers are client-controlled, so the value is only
//! trustworthy behind a reverse proxy configured to overwrite them. Deployed
//! bare, a client can pick its own bucket; it cannot bypass limiting
//! entirely, since every request lands in some bucket.
//!
//! Requests with no forwarding headers at all share the `"unknown"` bucket
//! and are throttled collectively.

use std::borrow::Cow;

use axum::http::{HeaderMap, Request};

/// Bucket key for requests whose client IP cannot be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// The client IP for a request: the first hop in `X-Forwarded-For`, then
/// `X-Real-IP`, then [`UNKNOWN_IP`].
pub fn extract_client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    match forwarded_ip(req.headers()) {
        Some(ip) => Cow::Owned(ip),
        None => Cow::Borrowed(UNKNOWN_IP),
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let first_hop = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next());

    let candidate = match first_hop {
        Some(ip) => Some(ip),
        None => headers.get("x-real-ip").and_then(|v| v.to_str().ok()),
    };

    candidate
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
}
