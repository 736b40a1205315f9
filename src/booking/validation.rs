use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::trip::{TripRequest, TripType};

pub const MIN_LEAD_MINUTES: i64 = 30;
pub const MAX_RENTAL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a valid pickup location")]
    MissingSource,
    #[error("Please select a valid drop location")]
    MissingDestination,
    #[error("Rental hours must be between 1 and 24")]
    HoursOutOfRange,
    #[error("Pickup time must be at least 30 minutes from now")]
    PickupTooSoon,
    #[error("Return time must be after pickup time")]
    ReturnNotAfterPickup,
}

/// Checks run in order and the first failure is returned.
pub fn validate_trip(request: &TripRequest, now: DateTime<Utc>) -> Result<(), ValidationError> {
    if !request.source_coords.is_some_and(|c| c.is_valid()) {
        return Err(ValidationError::MissingSource);
    }

    if request.trip_type.needs_destination()
        && !request.destination_coords.is_some_and(|c| c.is_valid())
    {
        return Err(ValidationError::MissingDestination);
    }

    if request.trip_type == TripType::HourlyRental
        && !request.hours.is_some_and(|h| (1..=MAX_RENTAL_HOURS).contains(&h))
    {
        return Err(ValidationError::HoursOutOfRange);
    }

    let earliest = now + Duration::minutes(MIN_LEAD_MINUTES);
    let pickup = match request.pickup_datetime {
        Some(pickup) if pickup >= earliest => pickup,
        _ => return Err(ValidationError::PickupTooSoon),
    };

    if request.trip_type == TripType::RoundTrip
        && !request.return_datetime.is_some_and(|ret| ret > pickup)
    {
        return Err(ValidationError::ReturnNotAfterPickup);
    }

    Ok(())
}
