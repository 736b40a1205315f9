use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::AuthSession;
use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

/// Signed-in user, resolved from `Authorization: Bearer <token>`.
pub struct CurrentUser(pub AuthSession);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("please log in".to_string()))?;

        state
            .auth
            .current(token)
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("session expired, please log in again".to_string()))
    }
}

/// Browser tab session that owns the transient session storage.
pub struct BrowserSession(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BrowserSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= 128)
            .map(|id| BrowserSession(id.to_string()))
            .ok_or_else(|| AppError::BadRequest(format!("{SESSION_HEADER} header is required")))
    }
}
