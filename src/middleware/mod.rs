//! HTTP middleware for recovery, rate limiting, authentication, and tracing.
//!
//! # Architecture
//!
//! ```text
//! Request → Recovery → Rate Limiter → Authenticator → Router → Authorizer → Handler
//!              ↓            ↓               ↓                       ↓
//!          500 JSON     429 + Retry    Principal ext        401 / 403 JSON
//! ```
//!
//! Recovery sits outermost so a panic anywhere below it still produces a
//! well-formed JSON response. The authenticator never rejects anonymous
//! requests; it only classifies them. Rejection is the authorizer's job,
//! applied per route.

pub mod auth;
pub mod authorize;
pub mod ip;
pub mod rate_limit;
pub mod recovery;
pub mod request_id;

pub use auth::{AuthLayer, Principal};
pub use authorize::RequirePermission;
pub use ip::{UNKNOWN_IP, extract_client_ip};
pub use rate_limit::{RateLimitError, RateLimitLayer};
pub use recovery::recovery_layer;
pub use request_id::RequestIdLayer;
