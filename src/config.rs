use std::env;

use crate::error::AppError;

const DEFAULT_GEOCODER_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DEFAULT_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub fare_service_url: String,
    pub maps_api_key: String,
    pub geocoder_url: String,
    /// Base URL of the hosted database. Empty selects the in-memory store.
    pub database_url: String,
    pub database_auth: Option<String>,
    pub auth_api_key: String,
    pub auth_base_url: String,
    /// When set, OTP codes are checked against this value instead of the hosted provider.
    pub otp_test_code: Option<String>,
    pub default_country_code: String,
    pub upstream_timeout_secs: u64,
    pub static_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            fare_service_url: required("FARE_SERVICE_URL")?,
            maps_api_key: env::var("MAPS_API_KEY").unwrap_or_default(),
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| DEFAULT_GEOCODER_URL.to_string()),
            database_url: env::var("DATABASE_URL").unwrap_or_default(),
            database_auth: optional("DATABASE_AUTH"),
            auth_api_key: env::var("AUTH_API_KEY").unwrap_or_default(),
            auth_base_url: env::var("AUTH_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_AUTH_BASE_URL.to_string()),
            otp_test_code: optional("OTP_TEST_CODE"),
            default_country_code: env::var("DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| "+91".to_string()),
            upstream_timeout_secs: parse_or_default("UPSTREAM_TIMEOUT_SECS", 15)?,
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    optional(key).ok_or_else(|| AppError::Internal(format!("{key} must be set")))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
