//! Collaborator contract required from the conferencing client library
//!
//! The signaling protocol, codecs and media transport live behind these
//! traits. The core only subscribes to events, drives the lifecycle and
//! sends text.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::{LocalAudioSource, StreamId};
use crate::config::{InitOptions, ServerOptions};

use super::events::{
    ConferenceEvent, ConferenceEventKind, ConnectionEvent, ConnectionEventKind, MediaKind,
    Participant,
};

/// Handle returned when a listener is registered, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Event callback registered with a connection or session
pub type Listener<E> = Arc<dyn Fn(E) + Send + Sync>;

/// One-shot callback fired when a remote track stops
pub type StopCallback = Box<dyn FnOnce() + Send>;

/// Options for a new session; the service defaults are used for everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceOptions {}

/// Entry point of the client library
pub trait ConferenceClient: Send + Sync {
    /// Apply global options (audio quality, level reporting)
    fn init(&self, options: &InitOptions) -> Result<()>;

    /// Create a fresh, unconnected signaling link
    fn create_connection(&self, server: &ServerOptions) -> Result<Arc<dyn Connection>>;

    /// Build the outbound publish track from the fixed local source
    fn create_local_audio_track(&self, source: Arc<LocalAudioSource>) -> Result<Arc<dyn LocalTrack>>;
}

/// Signaling link to the service
#[async_trait]
pub trait Connection: Send + Sync {
    fn add_listener(
        &self,
        kind: ConnectionEventKind,
        listener: Listener<ConnectionEvent>,
    ) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);

    /// Open the link; the outcome arrives as an established/failed event
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Negotiate the named session over this link
    fn init_conference(
        &self,
        name: &str,
        options: &ConferenceOptions,
    ) -> Result<Arc<dyn Conference>>;
}

/// A joined (or joining) multi-party room
#[async_trait]
pub trait Conference: Send + Sync {
    fn name(&self) -> &str;

    fn add_listener(
        &self,
        kind: ConferenceEventKind,
        listener: Listener<ConferenceEvent>,
    ) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);

    fn set_display_name(&self, name: &str);

    /// Request to join; completion arrives as a joined event
    fn join(&self) -> Result<()>;

    async fn leave(&self) -> Result<()>;

    async fn add_track(&self, track: Arc<dyn LocalTrack>) -> Result<()>;

    /// Current roster, excluding the local participant
    fn participants(&self) -> Vec<Participant>;

    fn participant_by_id(&self, id: &str) -> Option<Participant>;

    /// Send text to everyone, or to one participant when `recipient` is set
    fn send_message(&self, text: &str, recipient: Option<&str>) -> Result<()>;
}

impl fmt::Debug for dyn Conference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conference").field("name", &self.name()).finish()
    }
}

/// Outbound audio publish handle
#[async_trait]
pub trait LocalTrack: Send + Sync + fmt::Debug {
    fn track_id(&self) -> &str;

    async fn unmute(&self) -> Result<()>;

    async fn mute(&self) -> Result<()>;

    async fn dispose(&self) -> Result<()>;
}

/// A media track published by a remote participant
pub trait RemoteTrack: Send + Sync + fmt::Debug {
    fn track_id(&self) -> &str;

    fn participant_id(&self) -> Option<&str>;

    fn media_kind(&self) -> MediaKind;

    fn is_local(&self) -> bool;

    /// Identity of the underlying media stream
    fn stream_id(&self) -> &StreamId;

    /// Register a callback fired once when the track stops delivering
    fn on_stopped(&self, callback: StopCallback);
}
