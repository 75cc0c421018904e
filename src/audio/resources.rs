//! Per-participant audio resources
//!
//! A route pairs the source tap and the playback sink created from one remote
//! stream, so taps and sinks can never drift apart in count. Releasing a route
//! disconnects the tap, detaches it from the mix and pauses the sink, exactly
//! once, whether it is released explicitly or dropped.

use std::sync::Arc;

use log::{debug, warn};

use crate::error::{MeetingError, Result};

use super::backend::{AudioBackend, PlaybackSink, SourceTap};
use super::mix::OutputMix;
use super::stream::{RouteId, StreamId};

pub struct AudioRoute {
    id: RouteId,
    stream: StreamId,
    tap: Box<dyn SourceTap>,
    sink: Box<dyn PlaybackSink>,
    mix: Arc<OutputMix>,
    released: bool,
}

impl AudioRoute {
    /// Create the sink and tap for `stream` and connect the tap into the mix
    pub fn open(
        id: RouteId,
        stream: StreamId,
        backend: &dyn AudioBackend,
        mix: Arc<OutputMix>,
    ) -> Result<Self> {
        let mut sink = backend
            .create_sink(&stream)
            .map_err(|e| MeetingError::Audio(format!("sink for {}: {}", stream, e)))?;
        sink.set_muted(true);

        let mut tap = match backend.create_tap(&stream) {
            Ok(tap) => tap,
            Err(e) => {
                sink.pause();
                return Err(MeetingError::Audio(format!("tap for {}: {}", stream, e)));
            }
        };

        if let Err(e) = sink.play() {
            // The tap still works; the platform may just refuse autoplay
            warn!("Playback sink for {} did not start: {}", stream, e);
        }

        tap.connect(mix.connect(id));
        debug!("Opened {} for stream {}", id, stream);

        Ok(Self {
            id,
            stream,
            tap,
            sink,
            mix,
            released: false,
        })
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.tap.disconnect();
        self.mix.disconnect(self.id);
        self.sink.pause();
        debug!("Released {} for stream {}", self.id, self.stream);
    }
}

impl Drop for AudioRoute {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for AudioRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioRoute")
            .field("id", &self.id)
            .field("stream", &self.stream)
            .field("released", &self.released)
            .finish()
    }
}

/// Active routes of one participant
#[derive(Debug, Default)]
pub struct AudioResourceSet {
    routes: Vec<AudioRoute>,
}

impl AudioResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, route: AudioRoute) {
        self.routes.push(route);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn tap_count(&self) -> usize {
        self.routes.len()
    }

    pub fn sink_count(&self) -> usize {
        self.routes.len()
    }

    pub fn contains_stream(&self, stream: &StreamId) -> bool {
        self.routes.iter().any(|r| r.stream_id() == stream)
    }

    /// Release and remove one specific route
    pub fn release_route(&mut self, id: RouteId) -> bool {
        match self.routes.iter().position(|r| r.id() == id) {
            Some(index) => {
                self.routes.remove(index).release();
                true
            }
            None => false,
        }
    }

    /// Release and remove the first route built from `stream`
    pub fn release_stream(&mut self, stream: &StreamId) -> Option<RouteId> {
        let index = self.routes.iter().position(|r| r.stream_id() == stream)?;
        let mut route = self.routes.remove(index);
        route.release();
        Some(route.id())
    }

    /// Release every route. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let count = self.routes.len();
        for mut route in self.routes.drain(..) {
            route.release();
        }
        count
    }
}
