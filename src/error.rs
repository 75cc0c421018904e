//! Error types for the meeting session core
//!
//! Nothing in here is fatal to the host: every variant is either reported to
//! the host as a user-visible error or logged and dropped.

use thiserror::Error;

/// Failures surfaced by the session core
#[derive(Debug, Error)]
pub enum MeetingError {
    /// The signaling link was rejected or could not be opened
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A send was attempted while no session is joined
    #[error("No active session")]
    NoActiveSession,

    /// A directed message named a participant that is not in the roster
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    /// The inbound payload could not be interpreted as a command
    #[error("Invalid inbound payload: {0}")]
    InvalidPayload(String),

    /// Host-supplied configuration could not be used
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A tap or sink could not be created for a remote stream
    #[error("Audio resource error: {0}")]
    Audio(String),

    /// The conferencing client rejected an operation
    #[error("Client error: {0}")]
    Client(String),
}

impl MeetingError {
    /// Message suitable for showing to the user in the host
    pub fn user_message(&self) -> String {
        match self {
            MeetingError::ConnectionFailed(_) => "Connection Failed.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MeetingError>;
