//! Conferencing client collaborator
//!
//! This module provides:
//! - The traits the external client library is driven through
//! - Connection and session event types
//! - Listener bookkeeping for symmetric unsubscription

pub mod contract;
pub mod events;
pub mod subscription;

pub use contract::{
    Conference, ConferenceClient, ConferenceOptions, Connection, Listener, ListenerId,
    LocalTrack, RemoteTrack, StopCallback,
};
pub use events::{
    ConferenceEvent, ConferenceEventKind, ConnectionEvent, ConnectionEventKind, IncomingMessage,
    MediaKind, Participant,
};
pub use subscription::Subscriptions;
