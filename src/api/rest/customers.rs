use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::rest::extract::CurrentUser;
use crate::error::AppError;
use crate::models::customer::Customer;
use crate::models::trip::TripSummary;
use crate::persistence::customers::{get_customer, save_customer, update_customer};
use crate::persistence::trips::list_customer_trips;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", post(register_customer))
        .route("/customers/me", get(get_profile).patch(update_profile))
        .route("/customers/me/trips", get(trip_history))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub dob: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub dob: Option<String>,
}

fn check_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), AppError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::BadRequest("Please enter a valid email".to_string()));
    }
    Ok(())
}

async fn register_customer(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<Customer>, AppError> {
    check_name(&payload.name)?;
    check_email(&payload.email)?;

    match get_customer(state.store.as_ref(), &session.uid).await {
        Ok(_) => return Err(AppError::Conflict("Customer already registered".to_string())),
        Err(AppError::NotFound(_)) => {}
        Err(err) => return Err(err),
    }

    let customer = Customer {
        name: payload.name.trim().to_string(),
        email: payload.email.trim().to_string(),
        dob: payload.dob,
        phone: session.phone.clone(),
        trips: None,
    };
    save_customer(state.store.as_ref(), &session.uid, &customer).await?;

    tracing::info!(uid = %session.uid, "customer registered");
    Ok(Json(customer))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(get_customer(state.store.as_ref(), &session.uid).await?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Customer>, AppError> {
    let store = state.store.as_ref();
    get_customer(store, &session.uid).await?;

    let mut fields = Map::new();
    if let Some(name) = payload.name {
        check_name(&name)?;
        fields.insert("name".to_string(), Value::String(name.trim().to_string()));
    }
    if let Some(email) = payload.email {
        check_email(&email)?;
        fields.insert("email".to_string(), Value::String(email.trim().to_string()));
    }
    if let Some(dob) = payload.dob {
        fields.insert("dob".to_string(), Value::String(dob));
    }

    if !fields.is_empty() {
        update_customer(store, &session.uid, fields).await?;
    }

    Ok(Json(get_customer(store, &session.uid).await?))
}

async fn trip_history(
    State(state): State<Arc<AppState>>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<TripSummary>>, AppError> {
    Ok(Json(list_customer_trips(state.store.as_ref(), &session.uid).await?))
}
