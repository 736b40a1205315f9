use serde_json::{json, Map, Value};

use crate::error::AppError;
use crate::models::customer::Customer;
use crate::persistence::{key, read, write, HostedStore};

pub async fn get_customer(store: &dyn HostedStore, customer_id: &str) -> Result<Customer, AppError> {
    let path = format!("customers/{}", key(customer_id)?);
    read(store, &path)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))
}

pub async fn save_customer(
    store: &dyn HostedStore,
    customer_id: &str,
    customer: &Customer,
) -> Result<(), AppError> {
    let path = format!("customers/{}", key(customer_id)?);
    write(store, &path, customer).await
}

/// Partial profile edit. Only the listed fields are touched.
pub async fn update_customer(
    store: &dyn HostedStore,
    customer_id: &str,
    fields: Map<String, Value>,
) -> Result<(), AppError> {
    let path = format!("customers/{}", key(customer_id)?);
    store.update(&path, fields).await
}

/// A customer without any `trips` entry is reported as an error, not as an
/// empty list.
pub async fn get_customer_trip_ids(
    store: &dyn HostedStore,
    customer_id: &str,
) -> Result<Vec<String>, AppError> {
    let path = format!("customers/{}/trips", key(customer_id)?);
    let trips: Map<String, Value> = read(store, &path)
        .await?
        .ok_or_else(|| AppError::NotFound("No trips found for this customer".to_string()))?;

    Ok(trips
        .into_iter()
        .filter(|(_, booked)| booked.as_bool().unwrap_or(false))
        .map(|(trip_id, _)| trip_id)
        .collect())
}

pub async fn customer_owns_trip(
    store: &dyn HostedStore,
    customer_id: &str,
    trip_id: &str,
) -> Result<bool, AppError> {
    let path = format!("customers/{}/trips/{}", key(customer_id)?, key(trip_id)?);
    Ok(store.get(&path).await?.and_then(|v| v.as_bool()).unwrap_or(false))
}

pub async fn link_trip_to_customer(
    store: &dyn HostedStore,
    customer_id: &str,
    trip_id: &str,
) -> Result<(), AppError> {
    let path = format!("customers/{}/trips/{}", key(customer_id)?, key(trip_id)?);
    store.set(&path, json!(true)).await
}
