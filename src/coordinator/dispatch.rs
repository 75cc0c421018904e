//! Event dispatcher
//!
//! Every external callback (host, connection, session, track stopped) is
//! funnelled into one queue so events are handled one at a time. Connection
//! and session events carry the generation of the link that produced them.

use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;

use crate::audio::RouteId;
use crate::client::{ConferenceEvent, ConnectionEvent, Listener, StopCallback};
use crate::host::HostEvent;

#[derive(Debug)]
pub enum CoordinatorEvent {
    Host(HostEvent),
    Connection {
        generation: u64,
        event: ConnectionEvent,
    },
    Conference {
        generation: u64,
        event: ConferenceEvent,
    },
    TrackStopped {
        generation: u64,
        participant_id: String,
        route: RouteId,
    },
}

/// Cloneable sender side of the coordinator queue
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: mpsc::UnboundedSender<CoordinatorEvent>,
}

impl EventDispatcher {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CoordinatorEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue an event. Returns false once the coordinator has stopped.
    pub fn send(&self, event: CoordinatorEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                debug!("Coordinator stopped, dropping {:?}", event);
                false
            }
        }
    }

    pub fn host(&self, event: HostEvent) -> bool {
        self.send(CoordinatorEvent::Host(event))
    }

    pub fn connection_listener(&self, generation: u64) -> Listener<ConnectionEvent> {
        let dispatcher = self.clone();
        Arc::new(move |event: ConnectionEvent| {
            dispatcher.send(CoordinatorEvent::Connection { generation, event });
        })
    }

    pub fn conference_listener(&self, generation: u64) -> Listener<ConferenceEvent> {
        let dispatcher = self.clone();
        Arc::new(move |event: ConferenceEvent| {
            dispatcher.send(CoordinatorEvent::Conference { generation, event });
        })
    }

    pub fn track_stopped_callback(
        &self,
        generation: u64,
        participant_id: String,
        route: RouteId,
    ) -> StopCallback {
        let dispatcher = self.clone();
        Box::new(move || {
            dispatcher.send(CoordinatorEvent::TrackStopped {
                generation,
                participant_id,
                route,
            });
        })
    }
}
