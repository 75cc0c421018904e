//! Participant audio router
//!
//! Creates and releases remote audio routes in response to track-added,
//! track-stopped, track-removed and user-left events. Every tap it creates is
//! eventually disconnected and every sink eventually paused, on every exit path.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

use crate::client::{MediaKind, RemoteTrack};
use crate::error::Result;

use super::backend::AudioBackend;
use super::mix::OutputMix;
use super::resources::{AudioResourceSet, AudioRoute};
use super::stream::RouteId;

pub struct ParticipantAudioRouter {
    backend: Arc<dyn AudioBackend>,
    mix: Arc<OutputMix>,
    entries: HashMap<String, AudioResourceSet>,
    next_route: u64,
}

impl ParticipantAudioRouter {
    pub fn new(backend: Arc<dyn AudioBackend>, mix: Arc<OutputMix>) -> Self {
        Self {
            backend,
            mix,
            entries: HashMap::new(),
            next_route: 1,
        }
    }

    pub fn mix(&self) -> &Arc<OutputMix> {
        &self.mix
    }

    fn entry_or_create(&mut self, participant_id: &str) -> &mut AudioResourceSet {
        self.entries
            .entry(participant_id.to_string())
            .or_default()
    }

    /// Run `f` against an existing entry, dropping the entry once it is empty
    fn with_entry<T>(
        &mut self,
        participant_id: &str,
        f: impl FnOnce(&mut AudioResourceSet) -> T,
    ) -> Option<T> {
        let entry = self.entries.get_mut(participant_id)?;
        let result = f(entry);
        if entry.is_empty() {
            self.entries.remove(participant_id);
        }
        Some(result)
    }

    /// Route a newly added remote track into the mix
    ///
    /// Local, non-audio and participant-less tracks are ignored and yield
    /// `Ok(None)`. On success the participant and route id are returned so the
    /// caller can register the track-stopped callback.
    pub fn on_remote_track_added(
        &mut self,
        track: &dyn RemoteTrack,
    ) -> Result<Option<(String, RouteId)>> {
        if track.is_local() || track.media_kind() != MediaKind::Audio {
            debug!("Ignoring track {} (local or non-audio)", track.track_id());
            return Ok(None);
        }
        let Some(participant_id) = track.participant_id().map(str::to_string) else {
            debug!("Ignoring track {} without participant", track.track_id());
            return Ok(None);
        };

        let route_id = RouteId(self.next_route);
        self.next_route += 1;

        let route = AudioRoute::open(
            route_id,
            track.stream_id().clone(),
            self.backend.as_ref(),
            self.mix.clone(),
        )?;
        self.entry_or_create(&participant_id).insert(route);

        info!(
            "Mixing {} from participant {} (stream {})",
            route_id,
            participant_id,
            track.stream_id()
        );
        Ok(Some((participant_id, route_id)))
    }

    /// A specific remote track stopped delivering
    pub fn on_track_stopped(&mut self, participant_id: &str, route: RouteId) -> bool {
        let released = self
            .with_entry(participant_id, |entry| entry.release_route(route))
            .unwrap_or(false);
        if released {
            debug!("Track stopped: released {} of {}", route, participant_id);
        }
        released
    }

    /// Release the route whose stream matches the removed track
    pub fn on_remote_track_removed(&mut self, track: &dyn RemoteTrack) -> bool {
        let Some(participant_id) = track.participant_id() else {
            return false;
        };
        let stream = track.stream_id();

        match self
            .with_entry(participant_id, |entry| entry.release_stream(stream))
            .flatten()
        {
            Some(route) => {
                info!("Track removed: released {} of {}", route, participant_id);
                true
            }
            None => {
                debug!(
                    "Track removed for {} but no route matches stream {}",
                    participant_id, stream
                );
                false
            }
        }
    }

    /// Release every route of a departing participant
    pub fn on_user_left(&mut self, participant_id: &str) -> usize {
        let released = self
            .entries
            .remove(participant_id)
            .map(|mut entry| entry.release_all())
            .unwrap_or(0);
        if released > 0 {
            info!("Participant {} left: released {} routes", participant_id, released);
        }
        released
    }

    /// Release every route of every participant
    pub fn teardown_all(&mut self) -> usize {
        let released: usize = self
            .entries
            .drain()
            .map(|(_, mut entry)| entry.release_all())
            .sum();
        if released > 0 {
            info!("Released {} remote audio routes", released);
        }
        released
    }

    pub fn participant_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, participant_id: &str) -> Option<&AudioResourceSet> {
        self.entries.get(participant_id)
    }

    pub fn route_count(&self, participant_id: &str) -> usize {
        self.entries.get(participant_id).map_or(0, |e| e.len())
    }

    pub fn total_routes(&self) -> usize {
        self.entries.values().map(|e| e.len()).sum()
    }
}
