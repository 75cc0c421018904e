//! Message multiplexer
//!
//! Routes inbound commands to the session (or asks the coordinator to
//! connect / re-announce) and normalizes received messages into one outbound
//! record shape.

use std::sync::Arc;

use log::{debug, warn};

use crate::client::{Conference, ConferenceEvent};
use crate::error::MeetingError;
use crate::host::HostOutputs;
use crate::session::SessionManager;

use super::command::MessageCommand;
use super::record::MessageRecord;

/// What an inbound command turned into
#[derive(Debug)]
pub enum Dispatch {
    /// No connection exists: the coordinator should connect
    Connect,
    /// Re-emit the live session handle
    Announce(Arc<dyn Conference>),
    Delivered,
    Dropped,
}

pub struct MessageMultiplexer {
    outputs: Arc<dyn HostOutputs>,
}

impl MessageMultiplexer {
    pub fn new(outputs: Arc<dyn HostOutputs>) -> Self {
        Self { outputs }
    }

    pub fn dispatch(
        &self,
        command: MessageCommand,
        connection_live: bool,
        session: Option<&SessionManager>,
    ) -> Dispatch {
        match command {
            MessageCommand::Trigger => {
                if !connection_live {
                    return Dispatch::Connect;
                }
                match session {
                    Some(session) => Dispatch::Announce(session.conference()),
                    None => {
                        debug!("Trigger while connecting: nothing to announce yet");
                        Dispatch::Dropped
                    }
                }
            }
            MessageCommand::Broadcast(text) => {
                let Some(session) = session else {
                    debug!("Dropping broadcast: {}", MeetingError::NoActiveSession);
                    return Dispatch::Dropped;
                };
                match session.broadcast(&text) {
                    Ok(()) => Dispatch::Delivered,
                    Err(e) => {
                        warn!("Broadcast failed: {}", e);
                        Dispatch::Dropped
                    }
                }
            }
            MessageCommand::Direct { message, recipient } => {
                let Some(session) = session else {
                    debug!("Dropping private message: {}", MeetingError::NoActiveSession);
                    return Dispatch::Dropped;
                };
                match session.send_private(&message, &recipient) {
                    Ok(true) => Dispatch::Delivered,
                    Ok(false) => Dispatch::Dropped,
                    Err(e) => {
                        warn!("Private message failed: {}", e);
                        Dispatch::Dropped
                    }
                }
            }
        }
    }

    /// Emit the live session handle on the session outlet
    pub fn announce(&self, conference: Arc<dyn Conference>) {
        debug!("Announcing session '{}'", conference.name());
        self.outputs.emit_session(conference);
    }

    /// Turn a received message event into a record and emit it
    ///
    /// Non-message events yield `None`.
    pub fn forward(&self, event: &ConferenceEvent, session: &SessionManager) -> Option<MessageRecord> {
        let (incoming, private) = match event {
            ConferenceEvent::MessageReceived(incoming) => (incoming, false),
            ConferenceEvent::PrivateMessageReceived(incoming) => (incoming, true),
            _ => return None,
        };

        let username = session.display_name_of(&incoming.participant_id);
        let record = MessageRecord::from_incoming(incoming, username, private);
        self.outputs.emit_message(record.clone());
        Some(record)
    }
}
