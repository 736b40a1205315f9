use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}
