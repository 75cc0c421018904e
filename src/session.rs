//! Session manager
//!
//! Owns the joined session, the local publish track and the six session-level
//! listeners. Teardown removes every listener before leaving, so events the
//! leave itself generates (e.g. a synthetic user-left for self) cannot reach
//! torn-down handlers.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::audio::LocalAudioSource;
use crate::client::{
    Conference, ConferenceClient, ConferenceEventKind, LocalTrack, Subscriptions,
};
use crate::coordinator::EventDispatcher;
use crate::error::{MeetingError, Result};
use crate::messages::Recipient;

pub struct SessionManager {
    session_id: String,
    generation: u64,
    conference: Arc<dyn Conference>,
    subscriptions: Subscriptions<ConferenceEventKind>,
    local_track: Option<Arc<dyn LocalTrack>>,
    joined: bool,
    torn_down: bool,
}

impl SessionManager {
    /// Take ownership of a negotiated session, subscribe to it and join
    pub fn new(
        session_id: &str,
        conference: Arc<dyn Conference>,
        display_name: &str,
        dispatcher: &EventDispatcher,
        generation: u64,
    ) -> Result<Self> {
        let mut subscriptions = Subscriptions::new();
        for kind in ConferenceEventKind::ALL {
            let id = conference.add_listener(kind, dispatcher.conference_listener(generation));
            subscriptions.record(kind, id);
        }

        conference.set_display_name(display_name);
        if let Err(e) = conference.join() {
            subscriptions.release(|id| conference.remove_listener(id));
            return Err(MeetingError::Client(format!(
                "join '{}' failed: {:#}",
                session_id, e
            )));
        }

        info!(
            "Joining session '{}' as '{}' (generation {})",
            session_id, display_name, generation
        );

        Ok(Self {
            session_id: session_id.to_string(),
            generation,
            conference,
            subscriptions,
            local_track: None,
            joined: false,
            torn_down: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The live session handle
    pub fn conference(&self) -> Arc<dyn Conference> {
        self.conference.clone()
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Record the joined event. Returns false if it was already seen.
    pub fn mark_joined(&mut self) -> bool {
        if self.joined {
            return false;
        }
        self.joined = true;
        true
    }

    /// Build the local track from the fixed source, attach it and unmute it
    pub async fn publish_local(
        &mut self,
        client: &dyn ConferenceClient,
        source: Arc<LocalAudioSource>,
    ) -> Result<()> {
        let track = client
            .create_local_audio_track(source)
            .map_err(|e| MeetingError::Client(format!("local track: {:#}", e)))?;

        // Stored first so teardown disposes it even if attaching fails
        self.local_track = Some(track.clone());

        self.conference
            .add_track(track.clone())
            .await
            .map_err(|e| MeetingError::Client(format!("add track: {:#}", e)))?;
        track
            .unmute()
            .await
            .map_err(|e| MeetingError::Client(format!("unmute: {:#}", e)))?;

        info!(
            "Publishing local track {} in '{}'",
            track.track_id(),
            self.session_id
        );
        Ok(())
    }

    /// Send text to every participant
    pub fn broadcast(&self, text: &str) -> Result<()> {
        self.conference
            .send_message(text, None)
            .map_err(|e| MeetingError::Client(format!("broadcast: {:#}", e)))
    }

    /// Resolve a recipient to a participant id in the current roster
    ///
    /// Display names resolve to the first match.
    pub fn resolve_recipient(&self, recipient: &Recipient) -> Option<String> {
        match recipient {
            Recipient::Id(id) => self.conference.participant_by_id(id).map(|p| p.id),
            Recipient::DisplayName(name) => self
                .conference
                .participants()
                .into_iter()
                .find(|p| p.display_name.as_deref() == Some(name.as_str()))
                .map(|p| p.id),
        }
    }

    /// Send text to one participant. Returns `Ok(false)` if unresolved.
    pub fn send_private(&self, text: &str, recipient: &Recipient) -> Result<bool> {
        let Some(participant_id) = self.resolve_recipient(recipient) else {
            debug!(
                "Dropping private message: {}",
                MeetingError::UnknownParticipant(format!("{:?}", recipient))
            );
            return Ok(false);
        };

        self.conference
            .send_message(text, Some(&participant_id))
            .map_err(|e| MeetingError::Client(format!("private message: {:#}", e)))?;
        Ok(true)
    }

    /// Current display name of a participant, looked up at call time
    pub fn display_name_of(&self, participant_id: &str) -> Option<String> {
        self.conference
            .participant_by_id(participant_id)
            .and_then(|p| p.display_name)
    }

    pub fn set_display_name(&self, name: &str) {
        info!("Display name in '{}' set to '{}'", self.session_id, name);
        self.conference.set_display_name(name);
    }

    /// Unsubscribe, mute then dispose the local track, then leave
    ///
    /// Errors are logged, never returned. A second call is a no-op.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let conference = self.conference.clone();
        let removed = self
            .subscriptions
            .release(|id| conference.remove_listener(id));
        debug!("Session '{}': removed {} listeners", self.session_id, removed);

        if let Some(track) = self.local_track.take() {
            if let Err(e) = track.mute().await {
                warn!("Failed to mute local track: {:#}", e);
            }
            if let Err(e) = track.dispose().await {
                warn!("Failed to dispose local track: {:#}", e);
            }
        }

        if let Err(e) = self.conference.leave().await {
            warn!("Failed to leave session '{}': {:#}", self.session_id, e);
        }
        info!("Left session '{}'", self.session_id);
    }
}
