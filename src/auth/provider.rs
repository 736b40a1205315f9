use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{PhoneAuthProvider, VerifiedUser, VERIFICATION_TTL_MINUTES};
use crate::error::AppError;

/// Phone sign-in through the hosted identity REST API.
pub struct IdentityToolkitProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeRequest<'a> {
    phone_number: &'a str,
    recaptcha_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeResponse {
    session_info: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    session_info: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    phone_number: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityToolkitProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build auth client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn call<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R, AppError> {
        let response = self
            .client
            .post(format!("{}/accounts:{method}", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response.json().await?);
        }

        let status = response.status();
        let message = response
            .json::<ErrorEnvelope>()
            .await
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| status.to_string());

        Err(map_provider_error(&message))
    }
}

/// Provider messages look like `INVALID_CODE` or `TOO_SHORT : ...`.
fn map_provider_error(message: &str) -> AppError {
    let code = message.split([' ', ':']).next().unwrap_or(message);
    match code {
        "INVALID_CODE" => AppError::Unauthorized("Invalid OTP".to_string()),
        "SESSION_EXPIRED" | "INVALID_SESSION_INFO" => {
            AppError::Unauthorized("OTP expired, please request a new one".to_string())
        }
        "INVALID_PHONE_NUMBER" | "TOO_SHORT" | "TOO_LONG" => {
            AppError::BadRequest("Please enter a valid phone number".to_string())
        }
        "CAPTCHA_CHECK_FAILED" | "MISSING_RECAPTCHA_TOKEN" => {
            AppError::BadRequest("Captcha verification failed".to_string())
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => {
            AppError::Conflict("Too many attempts, try again later".to_string())
        }
        _ => AppError::Upstream(format!("auth provider error: {message}")),
    }
}

#[async_trait]
impl PhoneAuthProvider for IdentityToolkitProvider {
    async fn send_code(&self, phone: &str, recaptcha_token: &str) -> Result<String, AppError> {
        let response: SendCodeResponse = self
            .call(
                "sendVerificationCode",
                &SendCodeRequest {
                    phone_number: phone,
                    recaptcha_token,
                },
            )
            .await?;
        Ok(response.session_info)
    }

    async fn confirm(&self, verification_id: &str, code: &str) -> Result<VerifiedUser, AppError> {
        let response: SignInResponse = self
            .call(
                "signInWithPhoneNumber",
                &SignInRequest {
                    session_info: verification_id,
                    code,
                },
            )
            .await?;
        Ok(VerifiedUser {
            uid: response.local_id,
            phone: response.phone_number,
        })
    }
}

/// Development provider: no SMS is sent and every number accepts one fixed code.
pub struct FixedCodeProvider {
    code: String,
    issued: DashMap<String, IssuedCode>,
}

struct IssuedCode {
    phone: String,
    issued_at: DateTime<Utc>,
}

impl IssuedCode {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at > chrono::Duration::minutes(VERIFICATION_TTL_MINUTES)
    }
}

impl FixedCodeProvider {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            issued: DashMap::new(),
        }
    }
}

#[async_trait]
impl PhoneAuthProvider for FixedCodeProvider {
    async fn send_code(&self, phone: &str, _recaptcha_token: &str) -> Result<String, AppError> {
        let now = Utc::now();
        self.issued.retain(|_, issued| !issued.is_expired(now));

        let verification_id = Uuid::new_v4().simple().to_string();
        self.issued.insert(
            verification_id.clone(),
            IssuedCode {
                phone: phone.to_string(),
                issued_at: now,
            },
        );
        Ok(verification_id)
    }

    async fn confirm(&self, verification_id: &str, code: &str) -> Result<VerifiedUser, AppError> {
        let phone = self
            .issued
            .get(verification_id)
            .filter(|entry| !entry.is_expired(Utc::now()))
            .map(|entry| entry.phone.clone())
            .ok_or_else(|| {
                AppError::Unauthorized("OTP expired, please request a new one".to_string())
            })?;

        if code != self.code {
            return Err(AppError::Unauthorized("Invalid OTP".to_string()));
        }

        self.issued.remove(verification_id);
        let uid = format!("dev{}", phone.trim_start_matches('+'));
        Ok(VerifiedUser { uid, phone })
    }
}
