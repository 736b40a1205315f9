use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub dob: String,
    pub phone: String,
    /// Trip ids booked by this customer; absent until the first booking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trips: Option<BTreeMap<String, bool>>,
}

/// Login bookkeeping kept at `user/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub phone: String,
    pub last_login: DateTime<Utc>,
}
