use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::booking::status::StatusDisplay;
use crate::models::fleet::{Driver, Vehicle};
use crate::models::location::Coordinates;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TripType {
    #[serde(rename = "ONE WAY", alias = "ONE_WAY")]
    OneWay,
    #[serde(rename = "ROUND TRIP", alias = "ROUND_TRIP")]
    RoundTrip,
    #[serde(rename = "HOURLY RENTAL", alias = "HOURLY_RENTAL")]
    HourlyRental,
}

impl TripType {
    pub const ALL: [TripType; 3] = [TripType::OneWay, TripType::RoundTrip, TripType::HourlyRental];

    pub fn needs_destination(self) -> bool {
        self != TripType::HourlyRental
    }

    pub fn label(self) -> &'static str {
        match self {
            TripType::OneWay => "ONE WAY",
            TripType::RoundTrip => "ROUND TRIP",
            TripType::HourlyRental => "HOURLY RENTAL",
        }
    }
}

/// Raw planner input, exactly as the form holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripForm {
    pub trip_type: TripType,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_coords: Option<Coordinates>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub destination_coords: Option<Coordinates>,
    #[serde(default)]
    pub hours: Option<i64>,
    #[serde(default)]
    pub pickup_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub return_datetime: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub trip_type: TripType,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_coords: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_coords: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_datetime: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_datetime: Option<DateTime<Utc>>,
}

/// Body sent to the fare function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FareRequest {
    pub source_coords: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_coords: Option<Coordinates>,
}

/// Whatever the fare function answered. Never interpreted beyond the `error` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FareResult(pub Value);

impl FareResult {
    /// The `error` field when it carries something to show. `null`, `false`
    /// and blank strings count as no error.
    pub fn error_message(&self) -> Option<String> {
        match self.0.get("error")? {
            Value::Null | Value::Bool(false) => None,
            Value::String(msg) if msg.trim().is_empty() => None,
            Value::String(msg) => Some(msg.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Fields to merge into the trip data. Non-object payloads land under `fare`.
    pub fn into_fields(self) -> Map<String, Value> {
        match self.0 {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert("fare".to_string(), other);
                fields
            }
        }
    }
}

/// Planned trip plus fare, handed to the vehicle selection view.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteTripData {
    #[serde(flatten)]
    pub fare: Map<String, Value>,
    #[serde(flatten)]
    pub trip: TripRequest,
}

impl CompleteTripData {
    pub fn new(trip: TripRequest, fare: FareResult) -> Self {
        Self {
            fare: fare.into_fields(),
            trip,
        }
    }
}

/// A booked trip as stored in the hosted database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    #[serde(rename = "Id")]
    pub id: String,
    pub status: i64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub pickup_datetime: String,
    #[serde(default)]
    pub booked_time: String,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_number: Option<String>,
    pub trip_type: TripType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetail {
    pub trip: Trip,
    pub vehicle: Option<Vehicle>,
    pub driver: Option<Driver>,
    pub status: StatusDisplay,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    #[serde(flatten)]
    pub trip: Trip,
    pub status_display: StatusDisplay,
}
