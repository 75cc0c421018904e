//! Events raised by the conferencing client library

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::contract::RemoteTrack;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// A participant as reported by the session roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub display_name: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, display_name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.map(str::to_string),
        }
    }
}

/// Connection lifecycle callbacks a listener can register for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEventKind {
    Established,
    Failed,
    Disconnected,
}

impl ConnectionEventKind {
    pub const ALL: [ConnectionEventKind; 3] = [
        ConnectionEventKind::Established,
        ConnectionEventKind::Failed,
        ConnectionEventKind::Disconnected,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Established,
    Failed { reason: String },
    Disconnected,
}

impl ConnectionEvent {
    pub fn kind(&self) -> ConnectionEventKind {
        match self {
            ConnectionEvent::Established => ConnectionEventKind::Established,
            ConnectionEvent::Failed { .. } => ConnectionEventKind::Failed,
            ConnectionEvent::Disconnected => ConnectionEventKind::Disconnected,
        }
    }
}

/// Session-level callbacks a listener can register for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConferenceEventKind {
    TrackAdded,
    TrackRemoved,
    Joined,
    MessageReceived,
    PrivateMessageReceived,
    UserLeft,
}

impl ConferenceEventKind {
    pub const ALL: [ConferenceEventKind; 6] = [
        ConferenceEventKind::TrackAdded,
        ConferenceEventKind::TrackRemoved,
        ConferenceEventKind::Joined,
        ConferenceEventKind::MessageReceived,
        ConferenceEventKind::PrivateMessageReceived,
        ConferenceEventKind::UserLeft,
    ];
}

/// Text payload of a received message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub participant_id: String,
    pub text: String,
    /// Sender timestamp in epoch milliseconds, when the service provides one
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone)]
pub enum ConferenceEvent {
    TrackAdded(Arc<dyn RemoteTrack>),
    TrackRemoved(Arc<dyn RemoteTrack>),
    Joined,
    MessageReceived(IncomingMessage),
    PrivateMessageReceived(IncomingMessage),
    UserLeft { participant_id: String },
}

impl ConferenceEvent {
    pub fn kind(&self) -> ConferenceEventKind {
        match self {
            ConferenceEvent::TrackAdded(_) => ConferenceEventKind::TrackAdded,
            ConferenceEvent::TrackRemoved(_) => ConferenceEventKind::TrackRemoved,
            ConferenceEvent::Joined => ConferenceEventKind::Joined,
            ConferenceEvent::MessageReceived(_) => ConferenceEventKind::MessageReceived,
            ConferenceEvent::PrivateMessageReceived(_) => {
                ConferenceEventKind::PrivateMessageReceived
            }
            ConferenceEvent::UserLeft { .. } => ConferenceEventKind::UserLeft,
        }
    }
}
