pub mod provider;
pub mod session;

use async_trait::async_trait;

use crate::error::AppError;

pub use provider::{FixedCodeProvider, IdentityToolkitProvider};
pub use session::{AuthSession, AuthSessionManager, SessionChange};

/// How long an OTP stays redeemable after it was sent.
pub(crate) const VERIFICATION_TTL_MINUTES: i64 = 10;

/// Result of a successful OTP confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedUser {
    pub uid: String,
    pub phone: String,
}

/// Hosted phone-OTP provider.
#[async_trait]
pub trait PhoneAuthProvider: Send + Sync {
    /// Sends an SMS code and returns the provider's verification id.
    async fn send_code(&self, phone: &str, recaptcha_token: &str) -> Result<String, AppError>;

    async fn confirm(&self, verification_id: &str, code: &str) -> Result<VerifiedUser, AppError>;
}

/// Accepts `+` followed by 8 to 15 digits, or 10 bare digits which get the
/// default country code. Spaces, dashes and parentheses are ignored.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Result<String, AppError> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();

    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    if let Some(digits) = compact.strip_prefix('+') {
        if all_digits(digits) && (8..=15).contains(&digits.len()) {
            return Ok(compact);
        }
    } else if all_digits(&compact) && compact.len() == 10 {
        return Ok(format!("{default_country_code}{compact}"));
    }

    Err(AppError::BadRequest("Please enter a valid phone number".to_string()))
}
