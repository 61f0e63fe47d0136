//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │    Recovery      │ ← JSON 500 on panic, Connection: close
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← 429 + Retry-After if exceeded
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Authentication  │ ← classifies Principal, 401 on bad tokens
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Request ID, Trace│
//! │ CORS, Body Limit │
//! └────────┬─────────┘
//!          ▼
//!       Router ──→ per-route Authorizer ──→ Handler
//! ```
//!
//! Authorization is per route: read endpoints require `mangas:read`, write
//! endpoints require `mangas:write`. Registration, activation, token
//! issuance, and the healthcheck are open.

use std::time::Instant;

use axum::extract::{DefaultBodyLimit, MatchedPath, Request};
use axum::handler::Handler;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::handlers;
use crate::middleware::{AuthLayer, RequestIdLayer, RequirePermission, recovery_layer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let cors = build_cors_layer(&config.cors_allowed_origins);

    let read = RequirePermission::new(state.store.clone(), "mangas:read");
    let write = RequirePermission::new(state.store.clone(), "mangas:write");

    let mut router = Router::new()
        .route("/v1/healthcheck", get(handlers::healthcheck))
        .route(
            "/v1/mangas",
            get(handlers::list_mangas.layer(read.clone()))
                .post(handlers::create_manga.layer(write.clone())),
        )
        .route(
            "/v1/mangas/{id}",
            get(handlers::show_manga.layer(read))
                .patch(handlers::update_manga.layer(write.clone()))
                .delete(handlers::delete_manga.layer(write)),
        )
        // Both spellings are served; path matching has no slash redirect.
        .route("/v1/users", post(handlers::register_user))
        .route("/v1/users/", post(handlers::register_user))
        .route("/v1/users/activated", put(handlers::activate_user))
        .route(
            "/v1/tokens/authentication",
            post(handlers::create_authentication_token),
        )
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed);

    // Middleware is applied bottom to top: the last layer added runs first.

    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));
    router = router.layer(axum::middleware::from_fn(track_request_metrics));
    router = router.layer(cors);
    router = router.layer(TraceLayer::new_for_http());
    router = router.layer(RequestIdLayer::new());
    router = router.layer(AuthLayer::new(state.store.clone()));

    if let Some(ref rate_limit) = state.rate_limit {
        info!(
            rps = config.rate_limit_rps,
            burst = config.rate_limit_burst,
            "Rate limiting enabled"
        );
        router = router.layer(rate_limit.clone());
    } else {
        info!("Rate limiting disabled");
    }

    router = router.layer(recovery_layer());

    router.with_state(state)
}

/// Record the request counter and duration histogram for every request.
///
/// The endpoint label uses the matched route pattern, not the raw path, so
/// `/v1/mangas/42` and `/v1/mangas/43` share one label value.
async fn track_request_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    crate::metrics::record_request(
        &endpoint,
        method.as_str(),
        response.status().as_str(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// Structured 404 for unmatched paths.
async fn not_found() -> AppError {
    AppError::NotFound
}

/// Structured 405 for matched paths with an unsupported method.
async fn method_not_allowed(method: Method) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": format!("the {method} method is not supported for this resource"),
        })),
    )
}

/// Build CORS layer from configuration.
///
/// Using `*` (any origin) is convenient for development but production
/// deployments should specify explicit origins.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
