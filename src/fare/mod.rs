use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::trip::{FareRequest, FareResult};
use crate::state::AppState;

#[async_trait]
pub trait FareService: Send + Sync {
    async fn calculate(&self, request: &FareRequest) -> Result<FareResult, AppError>;
}

/// Posts coordinate pairs to the hosted fare function.
pub struct HttpFareClient {
    client: reqwest::Client,
    url: String,
}

impl HttpFareClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build fare client: {err}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FareService for HttpFareClient {
    async fn calculate(&self, request: &FareRequest) -> Result<FareResult, AppError> {
        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();

        // The fare function reports business errors as `{ "error": ... }`,
        // sometimes with a non-2xx status, so a JSON body always wins.
        match response.json::<serde_json::Value>().await {
            Ok(body) => Ok(FareResult(body)),
            Err(err) if status.is_success() => Err(AppError::Upstream(format!(
                "fare service returned an unreadable body: {err}"
            ))),
            Err(_) => Err(AppError::Upstream(format!(
                "fare service responded with {status}"
            ))),
        }
    }
}

/// Calls the fare service and records the outcome.
pub async fn request_fare(state: &AppState, request: &FareRequest) -> Result<FareResult, AppError> {
    let start = Instant::now();
    let result = state.fare.calculate(request).await;

    let outcome = match &result {
        Ok(fare) if fare.error_message().is_some() => "rejected",
        Ok(_) => "success",
        Err(_) => "error",
    };
    state
        .metrics
        .fare_request_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .fare_requests_total
        .with_label_values(&[outcome])
        .inc();

    match &result {
        Ok(_) => info!(outcome, "fare calculated"),
        Err(err) => warn!(error = %err, "fare request failed"),
    }

    result
}
