//! Inbound commands
//!
//! The single inbound port carries three shapes of payload. They are decided
//! here, once, at the boundary.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{MeetingError, Result};
use crate::host::HostPayload;

/// Who a directed message is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Id(String),
    DisplayName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageCommand {
    /// Connect if disconnected, otherwise re-announce the current session
    Trigger,
    /// Send text to every participant
    Broadcast(String),
    /// Send text to one participant
    Direct { message: String, recipient: Recipient },
}

#[derive(Debug, Deserialize)]
struct DirectedPayload {
    message: String,
    #[serde(default, rename = "userId")]
    user_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl MessageCommand {
    pub fn from_payload(payload: HostPayload) -> Result<Self> {
        match payload {
            HostPayload::Bang => Ok(MessageCommand::Trigger),
            HostPayload::Text(text) => Ok(MessageCommand::Broadcast(text)),
            HostPayload::Object(value) => Self::from_value(value),
        }
    }

    /// Interpret a raw JSON payload
    ///
    /// `userId` takes precedence over `username` when both are present.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(MessageCommand::Trigger),
            Value::String(text) => Ok(MessageCommand::Broadcast(text)),
            Value::Object(_) => {
                let payload: DirectedPayload = serde_json::from_value(value)
                    .map_err(|e| MeetingError::InvalidPayload(e.to_string()))?;

                let recipient = match (payload.user_id, payload.username) {
                    (Some(id), _) => Recipient::Id(id),
                    (None, Some(name)) => Recipient::DisplayName(name),
                    (None, None) => {
                        return Err(MeetingError::InvalidPayload(
                            "directed message needs userId or username".to_string(),
                        ))
                    }
                };

                Ok(MessageCommand::Direct {
                    message: payload.message,
                    recipient,
                })
            }
            other => Err(MeetingError::InvalidPayload(format!(
                "unsupported payload: {}",
                other
            ))),
        }
    }
}
