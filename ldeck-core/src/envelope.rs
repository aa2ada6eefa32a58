/// Wire shape for event bus messages.
///
/// Every message carries its type, the target list, the action performed,
/// arbitrary extra fields, and an ISO-8601 timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type, e.g. "list_update"
    #[serde(rename = "type")]
    pub kind: String,
    /// Target list id
    pub list_id: String,
    /// Action performed, e.g. "click", "health_sweep"
    pub action: String,
    /// Action-specific extra fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// When the message was created (ISO-8601 on the wire)
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Create an envelope stamped with the current time.
    pub fn new(
        kind: impl Into<String>,
        list_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            list_id: list_id.into(),
            action: action.into(),
            fields: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach an extra field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}
