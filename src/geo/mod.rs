use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::location::{Coordinates, GeocodedPlace};

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Address text to the best matching place.
    async fn forward(&self, address: &str) -> Result<Option<GeocodedPlace>, AppError>;

    /// Point (e.g. a map click) to the nearest street address.
    async fn reverse(&self, coords: Coordinates) -> Result<Option<GeocodedPlace>, AppError>;
}

/// Google Geocoding REST API.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
    #[serde(default)]
    place_id: Option<String>,
}

#[derive(Deserialize)]
struct Geometry {
    location: Coordinates,
}

impl GoogleGeocoder {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build geocoder client: {err}")))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    async fn lookup(&self, query: &[(&str, String)]) -> Result<Option<GeocodedPlace>, AppError> {
        let response: GeocodeResponse = self
            .client
            .get(&self.url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.status.as_str() {
            "OK" => Ok(response.results.into_iter().next().map(|result| GeocodedPlace {
                address: result.formatted_address,
                coords: result.geometry.location,
                place_id: result.place_id,
            })),
            "ZERO_RESULTS" => Ok(None),
            other => Err(AppError::Upstream(format!(
                "geocoder returned {other}: {}",
                response.error_message.unwrap_or_default()
            ))),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn forward(&self, address: &str) -> Result<Option<GeocodedPlace>, AppError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }
        self.lookup(&[("address", address.to_string())]).await
    }

    async fn reverse(&self, coords: Coordinates) -> Result<Option<GeocodedPlace>, AppError> {
        if !coords.is_valid() {
            return Err(AppError::BadRequest("coordinates out of range".to_string()));
        }
        self.lookup(&[("latlng", format!("{},{}", coords.lat, coords.lng))])
            .await
    }
}
