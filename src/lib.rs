//! # Manga API
//!
//! A JSON API for managing a manga catalogue, featuring:
//!
//! - **Versioned CRUD**: Optimistic concurrency on every update, with 409
//!   as the single retryable error
//! - **Security**: Bearer token authentication, per-route permissions,
//!   per-client rate limiting, input validation
//! - **Observability**: Request IDs, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Recovery → Rate Limit → Auth → Request ID)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (healthcheck, mangas, users, tokens)              │
//! │     └── per-route Authorizer (mangas:read / mangas:write)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Store (MangaStore, UserStore, TokenStore, PermissionStore) │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SQLite connection pool (bounded per-call deadlines)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use manga_api::{AppState, Config, build_router, store::Db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let db = Db::connect(
//!         &config.database_url,
//!         config.db_max_connections,
//!         config.db_query_timeout,
//!     )
//!     .await?;
//!
//!     let state = AppState::new(db, config, None);
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! Tune rate limiting:
//! ```bash
//! RATE_LIMIT_RPS=2 RATE_LIMIT_BURST=4 cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
