use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use cab_booking::api;
use cab_booking::auth::{FixedCodeProvider, IdentityToolkitProvider, PhoneAuthProvider};
use cab_booking::config::Config;
use cab_booking::error::AppError;
use cab_booking::fare::HttpFareClient;
use cab_booking::geo::GoogleGeocoder;
use cab_booking::persistence::{HostedStore, MemoryStore, RestStore};
use cab_booking::state::{AppState, Services};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let timeout = Duration::from_secs(config.upstream_timeout_secs);

    let store: Arc<dyn HostedStore> = if config.database_url.is_empty() {
        tracing::warn!("DATABASE_URL not set; using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(RestStore::new(
            config.database_url.clone(),
            config.database_auth.clone(),
            timeout,
        )?)
    };

    let phone_auth: Arc<dyn PhoneAuthProvider> = match &config.otp_test_code {
        Some(code) => {
            tracing::warn!("OTP_TEST_CODE set; SMS delivery disabled");
            Arc::new(FixedCodeProvider::new(code.clone()))
        }
        None => Arc::new(IdentityToolkitProvider::new(
            config.auth_base_url.clone(),
            config.auth_api_key.clone(),
            timeout,
        )?),
    };

    let services = Services {
        store,
        fare: Arc::new(HttpFareClient::new(config.fare_service_url.clone(), timeout)?),
        geocoder: Arc::new(GoogleGeocoder::new(
            config.geocoder_url.clone(),
            config.maps_api_key.clone(),
            timeout,
        )?),
        phone_auth,
    };

    let shared_state = Arc::new(AppState::new(
        services,
        &config.default_country_code,
        config.event_buffer_size,
    ));

    let app = api::rest::router_with_assets(shared_state.clone(), &config.static_dir);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    shared_state.auth.dispose();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
