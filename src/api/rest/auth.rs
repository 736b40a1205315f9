use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::rest::extract::CurrentUser;
use crate::auth::AuthSession;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/otp/send", post(send_otp))
        .route("/auth/otp/verify", post(verify_otp))
        .route("/auth/session", get(current_session))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub phone: String,
    #[serde(default)]
    pub recaptcha_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub verification_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub verification_id: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub session: AuthSession,
}

async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, AppError> {
    let verification_id = state
        .auth
        .start_verification(&payload.phone, &payload.recaptcha_token)
        .await?;

    Ok(Json(SendOtpResponse { verification_id }))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.code.trim().is_empty() {
        return Err(AppError::BadRequest("Please enter the OTP".to_string()));
    }

    let session = state
        .auth
        .complete_verification(&payload.verification_id, &payload.code)
        .await?;

    Ok(Json(LoginResponse {
        token: session.token.clone(),
        session,
    }))
}

async fn current_session(CurrentUser(session): CurrentUser) -> Json<AuthSession> {
    Json(session)
}

async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.auth.sign_out(&session.token)?;
    Ok(StatusCode::NO_CONTENT)
}
