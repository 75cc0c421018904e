// Outbound message record

use serde::{Deserialize, Serialize};

use crate::client::IncomingMessage;

/// A received message as emitted on the message outlet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Sender display name at delivery time; `None` if the sender is gone
    pub username: Option<String>,
    pub user_id: String,
    pub message: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// True only for direct messages
    pub private: bool,
}

impl MessageRecord {
    /// Build a record, stamping receipt time when the sender gave none
    pub fn from_incoming(incoming: &IncomingMessage, username: Option<String>, private: bool) -> Self {
        Self {
            username,
            user_id: incoming.participant_id.clone(),
            message: incoming.text.clone(),
            timestamp: incoming
                .timestamp
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
            private,
        }
    }
}
