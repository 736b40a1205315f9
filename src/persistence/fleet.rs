use crate::error::AppError;
use crate::models::fleet::{Driver, Vehicle};
use crate::persistence::{key, read, HostedStore};

pub async fn get_driver(store: &dyn HostedStore, driver_id: &str) -> Result<Driver, AppError> {
    let path = format!("drivers/{}", key(driver_id)?);
    read(store, &path)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))
}

pub async fn get_vehicle(
    store: &dyn HostedStore,
    vendor_id: &str,
    number: &str,
) -> Result<Vehicle, AppError> {
    let path = format!("vendors/{}/vehicles/{}", key(vendor_id)?, key(number)?);
    read(store, &path)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))
}
