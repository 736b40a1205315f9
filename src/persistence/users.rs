use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::customer::UserRecord;
use crate::persistence::{key, read, write, HostedStore};

pub async fn record_login(
    store: &dyn HostedStore,
    uid: &str,
    phone: &str,
    at: DateTime<Utc>,
) -> Result<(), AppError> {
    let record = UserRecord {
        phone: phone.to_string(),
        last_login: at,
    };
    write(store, &format!("user/{}", key(uid)?), &record).await
}

pub async fn get_user(store: &dyn HostedStore, uid: &str) -> Result<UserRecord, AppError> {
    read(store, &format!("user/{}", key(uid)?))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
