use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::persistence::HostedStore;

/// Hosted database REST API: each path is addressed as `{base}/{path}.json`.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
}

impl RestStore {
    pub fn new(
        base_url: impl Into<String>,
        auth: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build database client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.auth {
            Some(token) => builder.query(&[("auth", token.as_str())]),
            None => builder,
        }
    }
}

#[async_trait]
impl HostedStore for RestStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, AppError> {
        let value: Value = self
            .request(Method::GET, path)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok((!value.is_null()).then_some(value))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), AppError> {
        self.request(Method::PUT, path)
            .json(&value)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), AppError> {
        self.request(Method::PATCH, path)
            .json(&fields)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), AppError> {
        self.request(Method::DELETE, path)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
