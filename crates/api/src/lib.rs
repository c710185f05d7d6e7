//! HTTP boundary for the Math Mentor pipeline.
//!
//! Exposes the orchestrator's operations to UI collaborators:
//!
//! - `GET  /health` - liveness and uptime (unauthenticated)
//! - `POST /api/v1/solve` - run the solve pipeline on one problem
//! - `POST /api/v1/feedback` - submit feedback for an interaction
//! - `POST /api/v1/corrections` - teach an OCR/ASR text correction
//! - `GET  /api/v1/interactions` - recent solve history
//! - `GET  /api/v1/interactions/{id}` - one stored interaction
//!
//! Authentication is optional bearer-token (set `MENTOR_API_KEY`); the
//! health endpoint stays open for probes.

pub mod auth;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use auth::ApiKeyConfig;
pub use state::AppState;

/// Create the API router with all routes configured.
pub fn create_router(state: Arc<AppState>, api_key: Option<ApiKeyConfig>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut api = Router::new()
        .route("/solve", post(routes::solve))
        .route("/feedback", post(routes::submit_feedback))
        .route("/corrections", post(routes::record_correction))
        .route("/interactions", get(routes::recent_interactions))
        .route("/interactions/{id}", get(routes::get_interaction));

    if let Some(key) = api_key {
        api = api.layer(middleware::from_fn_with_state(key, auth::require_api_key));
    }

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server on the given address.
pub async fn serve(
    state: Arc<AppState>,
    api_key: Option<ApiKeyConfig>,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let router = create_router(state, api_key);

    info!(%addr, "Starting Math Mentor API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
