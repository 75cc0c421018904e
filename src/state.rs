// State management for the meeting session
//
// Everything live (link, session, remote audio routes) is owned here and
// handed to the components by reference from the coordinator.

use std::sync::Arc;

use serde::Serialize;

use crate::audio::{AudioBackend, OutputMix, ParticipantAudioRouter};
use crate::connection::{ConnectionPhase, ConnectionStateMachine};
use crate::session::SessionManager;

pub struct MeetingState {
    /// Signaling link and its lifecycle phase
    pub connection: ConnectionStateMachine,
    /// Joined session; at most one per link
    pub session: Option<SessionManager>,
    /// Remote audio routes per participant
    pub router: ParticipantAudioRouter,
}

/// Point-in-time view of the state, for logging and tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub phase: ConnectionPhase,
    pub generation: u64,
    pub session_name: Option<String>,
    pub joined: bool,
    pub participants_with_audio: usize,
    pub audio_routes: usize,
}

impl MeetingState {
    pub fn new(backend: Arc<dyn AudioBackend>, mix: Arc<OutputMix>) -> Self {
        Self {
            connection: ConnectionStateMachine::new(),
            session: None,
            router: ParticipantAudioRouter::new(backend, mix),
        }
    }

    /// The session, if it belongs to the link of `generation`
    pub fn session_for(&mut self, generation: u64) -> Option<&mut SessionManager> {
        if !self.connection.is_current(generation) {
            return None;
        }
        self.session
            .as_mut()
            .filter(|session| session.generation() == generation)
    }

    /// True when nothing live remains
    pub fn is_clear(&self) -> bool {
        !self.connection.is_live() && self.session.is_none() && self.router.total_routes() == 0
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            phase: self.connection.phase(),
            generation: self.connection.generation(),
            session_name: self.session.as_ref().map(|s| s.session_id().to_string()),
            joined: self.session.as_ref().map_or(false, |s| s.is_joined()),
            participants_with_audio: self.router.participant_count(),
            audio_routes: self.router.total_routes(),
        }
    }
}
