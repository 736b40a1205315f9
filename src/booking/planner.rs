use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::booking::assembler::assemble;
use crate::booking::session_storage::TRIP_DATA_KEY;
use crate::booking::validation::validate_trip;
use crate::error::AppError;
use crate::fare::request_fare;
use crate::models::location::GeocodedPlace;
use crate::models::trip::{CompleteTripData, FareRequest, TripForm};
use crate::state::AppState;

/// Route of the vehicle selection view that reads the stored trip data.
pub const SELECTION_ROUTE: &str = "/select-cab";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTrip {
    pub redirect: &'static str,
    pub trip_data: Value,
}

#[derive(Debug, Default, Serialize)]
pub struct PlannerPrefill {
    pub source: Option<GeocodedPlace>,
    pub destination: Option<GeocodedPlace>,
}

pub async fn plan_trip(
    state: &AppState,
    session_id: &str,
    form: TripForm,
    now: DateTime<Utc>,
) -> Result<PlannedTrip, AppError> {
    let request = assemble(form);

    if let Err(err) = validate_trip(&request, now) {
        record_plan(state, "invalid");
        return Err(AppError::Validation(err.to_string()));
    }

    let source_coords = request
        .source_coords
        .ok_or_else(|| AppError::Internal("validated trip lost its source".to_string()))?;
    let fare_request = FareRequest {
        source_coords,
        destination_coords: request.destination_coords,
    };

    let fare = match request_fare(state, &fare_request).await {
        Ok(fare) => fare,
        Err(err) => {
            record_plan(state, "error");
            return Err(err);
        }
    };

    if let Some(message) = fare.error_message() {
        record_plan(state, "rejected");
        return Err(AppError::Fare(message));
    }

    let trip_type = request.trip_type;
    let trip_data = serde_json::to_value(CompleteTripData::new(request, fare))
        .map_err(|err| AppError::Internal(format!("failed to serialize trip data: {err}")))?;

    state
        .sessions
        .set(session_id, TRIP_DATA_KEY, trip_data.clone());
    record_plan(state, "planned");

    info!(trip_type = trip_type.label(), "trip planned");

    Ok(PlannedTrip {
        redirect: SELECTION_ROUTE,
        trip_data,
    })
}

/// Resolves the `source` and `des` query parameters of the planner view.
/// Lookups that fail leave their side empty.
pub async fn prefill(
    state: &AppState,
    source: Option<&str>,
    destination: Option<&str>,
) -> PlannerPrefill {
    let (source, destination) = tokio::join!(
        lookup(state, source),
        lookup(state, destination)
    );

    PlannerPrefill {
        source,
        destination,
    }
}

async fn lookup(state: &AppState, address: Option<&str>) -> Option<GeocodedPlace> {
    let address = address.map(str::trim).filter(|a| !a.is_empty())?;
    match state.geocoder.forward(address).await {
        Ok(place) => place,
        Err(err) => {
            warn!(error = %err, address, "prefill geocoding failed");
            None
        }
    }
}

fn record_plan(state: &AppState, outcome: &str) {
    state
        .metrics
        .trip_plans_total
        .with_label_values(&[outcome])
        .inc();
}
