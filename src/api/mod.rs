// src/api/mod.rs

pub mod error;
pub mod routes;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::core::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

/// Mounts every endpoint under `/api` with request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::create_api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
