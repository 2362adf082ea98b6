//! Read-only HTTP stats surface.
//!
//! - GET /health
//! - GET /v1/cache/stats
//! - GET /metrics (Prometheus text format)

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::cache::{CacheHandle, CacheStats};

/// Application state shared across handlers.
pub struct AppState {
    pub cache: Arc<dyn CacheHandle>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(cache: Arc<dyn CacheHandle>) -> Self {
        Self {
            cache,
            start_time: Instant::now(),
        }
    }
}

/// Build the axum router with all stats routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/cache/stats", get(cache_stats))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the stats routes until the listener fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Stats server listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStatsResponse,
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub resident: usize,
    pub hit_ratio: f64,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            resident: stats.resident(),
            hit_ratio: stats.hit_ratio(),
            stats,
        }
    }
}

/// Taking stats waits on the cache lock, which may be held across a slow
/// backing store read, so it runs on the blocking pool.
async fn snapshot(state: &AppState) -> CacheStats {
    let cache = Arc::clone(&state.cache);
    match tokio::task::spawn_blocking(move || cache.stats()).await {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "Stats snapshot task failed");
            CacheStats::default()
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cache: snapshot(&state).await.into(),
    })
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStatsResponse> {
    Json(snapshot(&state).await.into())
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.cache.metrics().encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        ),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
        }
    }
}
