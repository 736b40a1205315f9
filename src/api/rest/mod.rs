pub mod auth;
pub mod customers;
pub mod extract;
pub mod planner;
pub mod trips;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    router_with_assets(state, "static")
}

/// Unmatched paths are served from `static_dir`, where the booking front end lives.
pub fn router_with_assets(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .merge(planner::router())
        .merge(auth::router())
        .merge(customers::router())
        .merge(trips::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws/session", get(ws::ws_handler))
        .with_state(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    signed_in_sessions: usize,
    browser_sessions: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        signed_in_sessions: state.auth.session_count(),
        browser_sessions: state.sessions.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
