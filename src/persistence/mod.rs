//! Keyed reads and writes against the hosted JSON database.
//!
//! Every accessor issues independent calls; nothing here spans a
//! transaction, and a missing record surfaces as [`AppError::NotFound`].

pub mod customers;
pub mod feedback;
pub mod fleet;
pub mod memory;
pub mod rest;
pub mod trips;
pub mod users;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

pub use memory::MemoryStore;
pub use rest::RestStore;

#[async_trait]
pub trait HostedStore: Send + Sync {
    /// `None` when nothing is stored at `path`.
    async fn get(&self, path: &str) -> Result<Option<Value>, AppError>;

    /// Replaces the subtree at `path`. Writing `null` deletes it.
    async fn set(&self, path: &str, value: Value) -> Result<(), AppError>;

    /// Writes each child of `fields` under `path`, leaving siblings alone.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), AppError>;

    async fn remove(&self, path: &str) -> Result<(), AppError>;
}

/// Rejects path segments the hosted database would misinterpret.
pub fn key(segment: &str) -> Result<&str, AppError> {
    let invalid = segment.is_empty()
        || segment
            .chars()
            .any(|c| matches!(c, '/' | '.' | '#' | '$' | '[' | ']') || c.is_control());

    if invalid {
        return Err(AppError::BadRequest(format!("invalid key: {segment:?}")));
    }
    Ok(segment)
}

pub(crate) async fn read<T: DeserializeOwned>(
    store: &dyn HostedStore,
    path: &str,
) -> Result<Option<T>, AppError> {
    match store.get(path).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|err| AppError::Internal(format!("malformed record at {path}: {err}"))),
        None => Ok(None),
    }
}

pub(crate) async fn write<T: Serialize>(
    store: &dyn HostedStore,
    path: &str,
    record: &T,
) -> Result<(), AppError> {
    let value = serde_json::to_value(record)
        .map_err(|err| AppError::Internal(format!("failed to serialize record for {path}: {err}")))?;
    store.set(path, value).await
}

#[cfg(test)]
mod tests {
    use super::key;

    #[test]
    fn key_rejects_path_injection() {
        assert!(key("trip-42").is_ok());
        assert!(key("").is_err());
        assert!(key("a/b").is_err());
        assert!(key("KA.01").is_err());
        assert!(key("x$y").is_err());
    }
}
