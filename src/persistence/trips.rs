use futures::future::join_all;
use serde_json::json;
use tracing::warn;

use crate::booking::status::{resolve, TripStatus};
use crate::error::AppError;
use crate::models::trip::{Trip, TripDetail, TripSummary};
use crate::persistence::customers::get_customer_trip_ids;
use crate::persistence::fleet::{get_driver, get_vehicle};
use crate::persistence::{key, read, HostedStore};

pub async fn get_trip(store: &dyn HostedStore, trip_id: &str) -> Result<Trip, AppError> {
    let path = format!("trips/{}", key(trip_id)?);
    read(store, &path)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))
}

pub async fn get_trip_status(store: &dyn HostedStore, trip_id: &str) -> Result<i64, AppError> {
    let path = format!("trips/{}/status", key(trip_id)?);
    read(store, &path)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip status not found".to_string()))
}

pub async fn set_trip_status(
    store: &dyn HostedStore,
    trip_id: &str,
    status: TripStatus,
) -> Result<(), AppError> {
    let path = format!("trips/{}/status", key(trip_id)?);
    store.set(&path, json!(status.code())).await
}

/// Trip plus its vehicle and driver. The vehicle and driver are read
/// concurrently once the trip is known; if either read fails the detail is
/// still returned with that part left empty.
pub async fn get_trip_detail(store: &dyn HostedStore, trip_id: &str) -> Result<TripDetail, AppError> {
    let trip = get_trip(store, trip_id).await?;

    let vehicle = async {
        match (trip.vendor.as_deref(), trip.vehicle_number.as_deref()) {
            (Some(vendor), Some(number)) => get_vehicle(store, vendor, number).await.map(Some),
            _ => Ok(None),
        }
    };
    let driver = async {
        match trip.driver.as_deref() {
            Some(driver_id) => get_driver(store, driver_id).await.map(Some),
            None => Ok(None),
        }
    };

    let (vehicle, driver) = tokio::join!(vehicle, driver);

    let vehicle = vehicle.unwrap_or_else(|err| {
        warn!(trip_id, error = %err, "vehicle lookup failed");
        None
    });
    let driver = driver.unwrap_or_else(|err| {
        warn!(trip_id, error = %err, "driver lookup failed");
        None
    });

    Ok(TripDetail {
        status: resolve(trip.status),
        trip,
        vehicle,
        driver,
    })
}

/// Booking history, newest first. Trips that cannot be read are skipped.
pub async fn list_customer_trips(
    store: &dyn HostedStore,
    customer_id: &str,
) -> Result<Vec<TripSummary>, AppError> {
    let trip_ids = get_customer_trip_ids(store, customer_id).await?;

    let results = join_all(trip_ids.iter().map(|id| get_trip(store, id))).await;

    let mut trips: Vec<TripSummary> = trip_ids
        .iter()
        .zip(results)
        .filter_map(|(trip_id, result)| match result {
            Ok(trip) => Some(TripSummary {
                status_display: resolve(trip.status),
                trip,
            }),
            Err(err) => {
                warn!(trip_id = %trip_id, error = %err, "skipping unreadable trip");
                None
            }
        })
        .collect();

    trips.sort_by(|a, b| b.trip.booked_time.cmp(&a.trip.booked_time));
    Ok(trips)
}
