use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::api::rest::extract::CurrentUser;
use crate::booking::status::{resolve, StatusDisplay, TripStatus};
use crate::documents::authorization::render_authorization;
use crate::error::AppError;
use crate::models::feedback::Feedback;
use crate::models::trip::TripDetail;
use crate::persistence::customers::{customer_owns_trip, get_customer};
use crate::persistence::feedback::{get_feedback, save_feedback};
use crate::persistence::trips::{get_trip_detail, get_trip_status, set_trip_status};
use crate::persistence::HostedStore;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trips/:id", get(trip_detail))
        .route("/trips/:id/cancel", post(cancel_trip))
        .route("/trips/:id/feedback", post(leave_feedback).get(my_feedback))
        .route("/trips/:id/authorization", get(authorization_letter))
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

async fn ensure_owner(store: &dyn HostedStore, uid: &str, trip_id: &str) -> Result<(), AppError> {
    if customer_owns_trip(store, uid, trip_id).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden("This trip does not belong to you".to_string()))
    }
}

async fn trip_detail(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<TripDetail>, AppError> {
    let store = state.store.as_ref();
    ensure_owner(store, &session.uid, &trip_id).await?;
    Ok(Json(get_trip_detail(store, &trip_id).await?))
}

async fn cancel_trip(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<StatusDisplay>, AppError> {
    let store = state.store.as_ref();
    ensure_owner(store, &session.uid, &trip_id).await?;

    let current = get_trip_status(store, &trip_id).await?;
    if !resolve(current).can_cancel {
        return Err(AppError::Conflict(
            "This trip can no longer be cancelled".to_string(),
        ));
    }

    let cancelled = TripStatus::CancelledByCustomer;
    set_trip_status(store, &trip_id, cancelled).await?;

    info!(trip_id = %trip_id, uid = %session.uid, from = current, "trip cancelled");
    Ok(Json(cancelled.display()))
}

async fn leave_feedback(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(trip_id): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<Feedback>, AppError> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".to_string()));
    }

    let store = state.store.as_ref();
    ensure_owner(store, &session.uid, &trip_id).await?;

    let status = get_trip_status(store, &trip_id).await?;
    if !resolve(status).can_leave_feedback {
        return Err(AppError::Conflict(
            "Feedback can be left once the trip is completed".to_string(),
        ));
    }

    let feedback = Feedback {
        rating: payload.rating,
        comment: payload.comment.trim().to_string(),
        submitted_at: Utc::now(),
    };
    save_feedback(store, &trip_id, &session.uid, &feedback).await?;

    info!(trip_id = %trip_id, rating = feedback.rating, "feedback saved");
    Ok(Json(feedback))
}

async fn my_feedback(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Json<Feedback>, AppError> {
    let store = state.store.as_ref();
    ensure_owner(store, &session.uid, &trip_id).await?;
    Ok(Json(get_feedback(store, &trip_id, &session.uid).await?))
}

async fn authorization_letter(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.as_ref();
    ensure_owner(store, &session.uid, &trip_id).await?;

    let detail = get_trip_detail(store, &trip_id).await?;
    if !detail.status.can_fetch_details {
        return Err(AppError::Conflict(
            "Trip details are not available for this booking yet".to_string(),
        ));
    }
    let (Some(driver), Some(vehicle)) = (detail.driver.as_ref(), detail.vehicle.as_ref()) else {
        return Err(AppError::Conflict(
            "Driver and vehicle details are not available yet".to_string(),
        ));
    };

    let customer = get_customer(store, &session.uid).await?;
    let document = render_authorization(&customer, &detail.trip, driver, vehicle, Utc::now());

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"authorization-{trip_id}.txt\""),
            ),
        ],
        document,
    ))
}
