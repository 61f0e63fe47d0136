//! Shared application state for Axum handlers.
//!
//! The state is cheap to clone: the store shares one connection pool and
//! the config is behind an `Arc`.
//!
//! # Structured Concurrency
//!
//! Background tasks are managed with `tokio_util::task::TaskTracker` and a
//! `CancellationToken`. Call `shutdown()` to stop the tasks and close the
//! database pool before the process exits.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::config::Config;
use crate::middleware::RateLimitLayer;
use crate::store::{Db, Store};

/// Shared application state, cloned per request handler.
#[derive(Clone)]
pub struct AppState {
    /// Per-table store interfaces over the shared pool.
    pub store: Store,
    /// Pool handle, kept for graceful close.
    db: Db,
    /// Application configuration.
    pub config: Arc<Config>,
    /// Rate limit layer, `None` when limiting is disabled.
    pub rate_limit: Option<RateLimitLayer>,
    /// Timestamp when the application started.
    pub started_at: Instant,
    /// Tracks spawned background tasks for graceful shutdown.
    task_tracker: TaskTracker,
    /// Signals background tasks to stop.
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Create the application state and spawn background tasks.
    ///
    /// When rate limiting is enabled this spawns a sweep task that
    /// periodically evicts idle limiter buckets, keeping the per-client
    /// bucket map from growing without bound.
    pub fn new(db: Db, config: Config, rate_limit: Option<RateLimitLayer>) -> Self {
        let store = Store::new(db.clone());
        let config = Arc::new(config);
        let task_tracker = TaskTracker::new();
        let cancellation_token = CancellationToken::new();

        let state = Self {
            store,
            db,
            config,
            rate_limit,
            started_at: Instant::now(),
            task_tracker,
            cancellation_token,
        };

        state.spawn_limiter_sweep_task();

        state
    }

    /// Spawn the background task that evicts idle rate-limiter buckets.
    ///
    /// `retain_recent` drops buckets that have fully refilled, i.e. clients
    /// idle long enough that forgetting them changes nothing.
    fn spawn_limiter_sweep_task(&self) {
        let Some(ref layer) = self.rate_limit else {
            return;
        };

        let limiter = layer.limiter();
        let sweep_interval = self.config.rate_limit_sweep_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(sweep_interval);
            ticker.tick().await; // the first tick fires immediately

            loop {
                tokio::select! {
                    // Prefer cancellation over the ticker.
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Limiter sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let before = limiter.len();
                        limiter.retain_recent();
                        debug!(
                            before,
                            after = limiter.len(),
                            "Swept idle rate limiter buckets"
                        );
                    }
                }
            }

            debug!("Limiter sweep task shutting down");
        });
    }

    /// Gracefully shut down background tasks and close the database pool.
    pub async fn shutdown(&self) {
        info!("Stopping background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        self.db.close().await;

        info!("Background tasks drained");
    }

    /// Application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
