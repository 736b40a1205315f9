use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{normalize_phone, PhoneAuthProvider, VERIFICATION_TTL_MINUTES};
use crate::error::AppError;
use crate::observability::metrics::Metrics;
use crate::persistence::users::record_login;
use crate::persistence::HostedStore;

const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    #[serde(skip_serializing)]
    pub token: String,
    pub uid: String,
    pub phone: String,
    pub signed_in_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionChange {
    #[serde(rename_all = "camelCase")]
    SignedIn {
        uid: String,
        phone: String,
        at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    SignedOut { uid: String, at: DateTime<Utc> },
}

impl SessionChange {
    pub fn uid(&self) -> &str {
        match self {
            SessionChange::SignedIn { uid, .. } | SessionChange::SignedOut { uid, .. } => uid,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingVerification {
    phone: String,
    started_at: DateTime<Utc>,
}

impl PendingVerification {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.started_at > Duration::minutes(VERIFICATION_TTL_MINUTES)
    }
}

/// Owns the OTP handshakes and signed-in sessions. Constructed once at
/// startup, shared through `AppState`, and torn down with [`dispose`].
///
/// [`dispose`]: AuthSessionManager::dispose
pub struct AuthSessionManager {
    provider: Arc<dyn PhoneAuthProvider>,
    store: Arc<dyn HostedStore>,
    default_country_code: String,
    sessions: DashMap<String, AuthSession>,
    pending: DashMap<String, PendingVerification>,
    events_tx: broadcast::Sender<SessionChange>,
    metrics: Metrics,
    disposed: AtomicBool,
}

impl AuthSessionManager {
    pub fn new(
        provider: Arc<dyn PhoneAuthProvider>,
        store: Arc<dyn HostedStore>,
        default_country_code: impl Into<String>,
        event_buffer_size: usize,
        metrics: Metrics,
    ) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            provider,
            store,
            default_country_code: default_country_code.into(),
            sessions: DashMap::new(),
            pending: DashMap::new(),
            events_tx,
            metrics,
            disposed: AtomicBool::new(false),
        }
    }

    fn ensure_active(&self) -> Result<(), AppError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(AppError::Internal("auth session manager disposed".to_string()));
        }
        Ok(())
    }

    /// Begins an OTP login. Any verification already pending for the same
    /// number is discarded before the new one is created, along with every
    /// verification that has outlived its TTL.
    pub async fn start_verification(
        &self,
        raw_phone: &str,
        recaptcha_token: &str,
    ) -> Result<String, AppError> {
        self.ensure_active()?;
        let phone = normalize_phone(raw_phone, &self.default_country_code)?;

        let now = Utc::now();
        self.pending
            .retain(|_, pending| pending.phone != phone && !pending.is_expired(now));

        let result = self.provider.send_code(&phone, recaptcha_token).await;
        self.record_otp("send", result.is_ok());
        let verification_id = result?;

        self.pending.insert(
            verification_id.clone(),
            PendingVerification {
                phone,
                started_at: Utc::now(),
            },
        );

        info!("otp sent");
        Ok(verification_id)
    }

    /// Confirms the code. A wrong code leaves the verification pending so
    /// the user can try again.
    pub async fn complete_verification(
        &self,
        verification_id: &str,
        code: &str,
    ) -> Result<AuthSession, AppError> {
        self.ensure_active()?;

        let pending = self
            .pending
            .get(verification_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                AppError::Unauthorized("OTP expired, please request a new one".to_string())
            })?;

        if pending.is_expired(Utc::now()) {
            self.pending.remove(verification_id);
            return Err(AppError::Unauthorized(
                "OTP expired, please request a new one".to_string(),
            ));
        }

        let result = self.provider.confirm(verification_id, code.trim()).await;
        self.record_otp("verify", result.is_ok());
        let user = result?;
        self.pending.remove(verification_id);

        let now = Utc::now();
        let session = AuthSession {
            token: Uuid::new_v4().simple().to_string(),
            uid: user.uid,
            phone: user.phone,
            signed_in_at: now,
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
        };

        if let Err(err) =
            record_login(self.store.as_ref(), &session.uid, &session.phone, session.signed_in_at)
                .await
        {
            warn!(uid = %session.uid, error = %err, "failed to record login");
        }

        self.expire_sessions(now);
        self.sessions.insert(session.token.clone(), session.clone());
        self.metrics.active_sessions.set(self.sessions.len() as i64);
        let _ = self.events_tx.send(SessionChange::SignedIn {
            uid: session.uid.clone(),
            phone: session.phone.clone(),
            at: session.signed_in_at,
        });

        info!(uid = %session.uid, "user signed in");
        Ok(session)
    }

    pub fn current(&self, token: &str) -> Option<AuthSession> {
        if self.disposed.load(Ordering::Acquire) {
            return None;
        }
        let session = self.sessions.get(token).map(|entry| entry.value().clone())?;
        if session.is_expired(Utc::now()) {
            self.end_session(token);
            return None;
        }
        Some(session)
    }

    pub fn sign_out(&self, token: &str) -> Result<AuthSession, AppError> {
        self.ensure_active()?;
        let session = self
            .end_session(token)
            .ok_or_else(|| AppError::Unauthorized("not signed in".to_string()))?;

        info!(uid = %session.uid, "user signed out");
        Ok(session)
    }

    fn end_session(&self, token: &str) -> Option<AuthSession> {
        let (_, session) = self.sessions.remove(token)?;

        self.metrics.active_sessions.set(self.sessions.len() as i64);
        let _ = self.events_tx.send(SessionChange::SignedOut {
            uid: session.uid.clone(),
            at: Utc::now(),
        });
        Some(session)
    }

    /// Ends every session past its expiry. Returns how many were ended.
    pub fn expire_sessions(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        for token in &expired {
            self.end_session(token);
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "expired sessions ended");
        }
        expired.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.events_tx.subscribe()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drops every session and pending verification. The manager rejects
    /// further logins afterwards.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let now = Utc::now();
        for entry in self.sessions.iter() {
            let _ = self.events_tx.send(SessionChange::SignedOut {
                uid: entry.value().uid.clone(),
                at: now,
            });
        }
        self.sessions.clear();
        self.pending.clear();
        self.metrics.active_sessions.set(0);

        info!("auth session manager disposed");
    }

    fn record_otp(&self, stage: &str, ok: bool) {
        let outcome = if ok { "success" } else { "error" };
        self.metrics
            .otp_requests_total
            .with_label_values(&[stage, outcome])
            .inc();
    }
}
