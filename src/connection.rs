//! Connection state machine
//!
//! idle → connecting → established → disconnected → idle
//!             └──→ failed ──────────────────────────┘
//!
//! Each `connect()` from idle creates a brand-new link with a new generation
//! number. Old links are never reused.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::client::{ConferenceClient, Connection, ConnectionEventKind, Subscriptions};
use crate::config::ServerOptions;
use crate::coordinator::EventDispatcher;
use crate::error::{MeetingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    Established,
    Failed,
    Disconnected,
}

pub struct ConnectionStateMachine {
    phase: ConnectionPhase,
    generation: u64,
    connection: Option<Arc<dyn Connection>>,
    subscriptions: Subscriptions<ConnectionEventKind>,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            generation: 0,
            connection: None,
            subscriptions: Subscriptions::new(),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Generation of the most recent link
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a link object currently exists, in any phase
    pub fn is_live(&self) -> bool {
        self.connection.is_some()
    }

    /// Whether an event tagged with `generation` belongs to the live link
    pub fn is_current(&self, generation: u64) -> bool {
        self.connection.is_some() && generation == self.generation
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Open a fresh link. No-op unless idle.
    ///
    /// Returns `Ok(false)` when ignored. If the link cannot even be opened the
    /// machine cleans up, returns to idle and reports a connection failure.
    pub async fn connect(
        &mut self,
        client: &dyn ConferenceClient,
        server: &ServerOptions,
        dispatcher: &EventDispatcher,
    ) -> Result<bool> {
        if self.phase != ConnectionPhase::Idle {
            debug!("connect() ignored in phase {:?}", self.phase);
            return Ok(false);
        }

        let connection = client
            .create_connection(server)
            .map_err(|e| MeetingError::ConnectionFailed(format!("{:#}", e)))?;

        self.generation += 1;
        let generation = self.generation;
        for kind in ConnectionEventKind::ALL {
            let id = connection.add_listener(kind, dispatcher.connection_listener(generation));
            self.subscriptions.record(kind, id);
        }
        self.connection = Some(connection.clone());
        self.phase = ConnectionPhase::Connecting;
        info!(
            "Connecting to {} (generation {})",
            server.hosts.domain, generation
        );

        if let Err(e) = connection.connect().await {
            self.phase = ConnectionPhase::Failed;
            self.begin_teardown();
            self.release(false).await;
            return Err(MeetingError::ConnectionFailed(format!("{:#}", e)));
        }

        Ok(true)
    }

    /// The link reported success. Returns the link to negotiate a session on.
    pub fn on_established(&mut self) -> Option<Arc<dyn Connection>> {
        if self.phase != ConnectionPhase::Connecting {
            warn!("Established event ignored in phase {:?}", self.phase);
            return None;
        }
        self.phase = ConnectionPhase::Established;
        info!("Connection established (generation {})", self.generation);
        self.connection.clone()
    }

    /// The link reported failure
    pub fn on_failed(&mut self) {
        if matches!(
            self.phase,
            ConnectionPhase::Connecting | ConnectionPhase::Established
        ) {
            self.phase = ConnectionPhase::Failed;
            warn!("Connection failed (generation {})", self.generation);
        }
    }

    /// First teardown step: unregister this machine's own callbacks
    ///
    /// Returns false when there is no link.
    pub fn begin_teardown(&mut self) -> bool {
        let Some(connection) = self.connection.as_ref() else {
            return false;
        };

        let removed = self.subscriptions.release(|id| connection.remove_listener(id));
        if matches!(
            self.phase,
            ConnectionPhase::Connecting | ConnectionPhase::Established
        ) {
            self.phase = ConnectionPhase::Disconnected;
        }
        debug!(
            "Connection teardown started: {} listeners removed, phase {:?}",
            removed, self.phase
        );
        true
    }

    /// Last teardown step: optionally close the link, drop it and return to idle
    pub async fn release(&mut self, disconnect: bool) {
        if let Some(connection) = self.connection.take() {
            self.subscriptions.release(|id| connection.remove_listener(id));

            if disconnect {
                if let Err(e) = connection.disconnect().await {
                    warn!("Disconnect failed: {:#}", e);
                }
            }
            info!("Connection released (generation {})", self.generation);
        }
        self.phase = ConnectionPhase::Idle;
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
