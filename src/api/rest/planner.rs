use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::api::rest::extract::BrowserSession;
use crate::booking::planner::{plan_trip, prefill, PlannedTrip, PlannerPrefill};
use crate::booking::session_storage::TRIP_DATA_KEY;
use crate::booking::status::{resolve, StatusDisplay};
use crate::error::AppError;
use crate::fare::request_fare;
use crate::models::location::{Coordinates, GeocodedPlace};
use crate::models::trip::{FareRequest, TripForm};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/geocode/forward", get(geocode_forward))
        .route("/geocode/reverse", get(geocode_reverse))
        .route("/planner/prefill", get(planner_prefill))
        .route("/fare", post(fare_proxy))
        .route("/trips/plan", post(submit_plan))
        .route("/session/trip-data", get(session_trip_data))
        .route("/status/:code", get(status_lookup))
}

#[derive(Deserialize)]
pub struct ForwardQuery {
    pub address: String,
}

#[derive(Deserialize)]
pub struct PrefillQuery {
    pub source: Option<String>,
    pub des: Option<String>,
}

async fn geocode_forward(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForwardQuery>,
) -> Result<Json<GeocodedPlace>, AppError> {
    state
        .geocoder
        .forward(&query.address)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Address not found".to_string()))
}

async fn geocode_reverse(
    State(state): State<Arc<AppState>>,
    Query(coords): Query<Coordinates>,
) -> Result<Json<GeocodedPlace>, AppError> {
    if !coords.is_valid() {
        return Err(AppError::BadRequest("coordinates out of range".to_string()));
    }

    state
        .geocoder
        .reverse(coords)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No address found for this location".to_string()))
}

async fn planner_prefill(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PrefillQuery>,
) -> Json<PlannerPrefill> {
    Json(prefill(&state, query.source.as_deref(), query.des.as_deref()).await)
}

/// Same-origin route to the fare function; the answer is returned untouched.
async fn fare_proxy(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FareRequest>,
) -> Result<Json<Value>, AppError> {
    let coords_valid = payload.source_coords.is_valid()
        && payload.destination_coords.is_none_or(|c| c.is_valid());
    if !coords_valid {
        return Err(AppError::BadRequest("coordinates out of range".to_string()));
    }

    let fare = request_fare(&state, &payload).await?;
    Ok(Json(fare.0))
}

async fn submit_plan(
    State(state): State<Arc<AppState>>,
    BrowserSession(session_id): BrowserSession,
    Json(form): Json<TripForm>,
) -> Result<Json<PlannedTrip>, AppError> {
    let planned = plan_trip(&state, &session_id, form, Utc::now()).await?;
    Ok(Json(planned))
}

async fn session_trip_data(
    State(state): State<Arc<AppState>>,
    BrowserSession(session_id): BrowserSession,
) -> Result<Json<Value>, AppError> {
    state
        .sessions
        .get(&session_id, TRIP_DATA_KEY)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No trip in progress".to_string()))
}

async fn status_lookup(Path(code): Path<i64>) -> Json<StatusDisplay> {
    Json(resolve(code))
}
