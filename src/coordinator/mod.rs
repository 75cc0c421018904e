//! Lifecycle coordinator
//!
//! Wires host lifecycle events, connection events and session events to the
//! components, one event at a time. Teardown always runs in the same order:
//! connection listeners, session (listeners, local track, leave), remote audio
//! routes, then the link itself.

pub mod dispatch;

pub use dispatch::{CoordinatorEvent, EventDispatcher};

use std::sync::Arc;

use anyhow::Context;
use log::{debug, error, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioBackend, LocalAudioSource, OutputMix};
use crate::client::{ConferenceClient, ConferenceEvent, ConferenceOptions, ConnectionEvent};
use crate::config::{coerce_bitrate, InitOptions, MeetingArgs, MeetingConfig, PropsUpdate};
use crate::error::MeetingError;
use crate::host::{HostEvent, HostOutputs, HostPayload, INLET_MAIN};
use crate::messages::{Dispatch, MessageCommand, MessageMultiplexer};
use crate::session::SessionManager;
use crate::state::{MeetingState, StateSnapshot};

/// Who asked for a teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// Argument change or destroy: the link is closed explicitly
    Local,
    /// The link reported failure or disconnection: it is only released
    LinkLost,
}

pub struct LifecycleCoordinator {
    client: Arc<dyn ConferenceClient>,
    outputs: Arc<dyn HostOutputs>,
    local_source: Arc<LocalAudioSource>,
    config: MeetingConfig,
    state: MeetingState,
    multiplexer: MessageMultiplexer,
    dispatcher: EventDispatcher,
    initialized: bool,
    destroyed: bool,
    /// Audio quality must be (re)applied before the next fresh connection
    quality_dirty: bool,
}

impl LifecycleCoordinator {
    pub fn new(
        client: Arc<dyn ConferenceClient>,
        backend: Arc<dyn AudioBackend>,
        outputs: Arc<dyn HostOutputs>,
        config: MeetingConfig,
        sample_rate: u32,
    ) -> (Self, UnboundedReceiver<CoordinatorEvent>) {
        let (dispatcher, receiver) = EventDispatcher::channel();
        let mix = Arc::new(OutputMix::new(sample_rate));

        let coordinator = Self {
            client,
            multiplexer: MessageMultiplexer::new(outputs.clone()),
            outputs,
            local_source: Arc::new(LocalAudioSource::new(sample_rate)),
            config,
            state: MeetingState::new(backend, mix),
            dispatcher,
            initialized: false,
            destroyed: false,
            quality_dirty: true,
        };
        (coordinator, receiver)
    }

    /// Start the event loop on the current tokio runtime
    pub fn spawn(
        client: Arc<dyn ConferenceClient>,
        backend: Arc<dyn AudioBackend>,
        outputs: Arc<dyn HostOutputs>,
        config: MeetingConfig,
        sample_rate: u32,
    ) -> MeetingHandle {
        let (coordinator, receiver) = Self::new(client, backend, outputs, config, sample_rate);
        let dispatcher = coordinator.dispatcher();
        let local_source = coordinator.local_source();
        let output_mix = coordinator.output_mix();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(coordinator.run(receiver, cancel.clone()));

        MeetingHandle {
            dispatcher,
            local_source,
            output_mix,
            cancel,
            task,
        }
    }

    /// Sender the host and collaborators use to queue events
    pub fn dispatcher(&self) -> EventDispatcher {
        self.dispatcher.clone()
    }

    /// Fixed input feeding the published local track
    pub fn local_source(&self) -> Arc<LocalAudioSource> {
        self.local_source.clone()
    }

    /// Fixed output receiving the mixed remote audio
    pub fn output_mix(&self) -> Arc<OutputMix> {
        self.state.router.mix().clone()
    }

    pub fn config(&self) -> &MeetingConfig {
        &self.config
    }

    pub fn state(&self) -> &MeetingState {
        &self.state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Process events until the queue closes, the token is cancelled or the
    /// host destroys the object
    pub async fn run(
        mut self,
        mut receiver: UnboundedReceiver<CoordinatorEvent>,
        cancel: CancellationToken,
    ) {
        info!("Meeting coordinator started");

        while !self.destroyed {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Coordinator cancelled");
                    None
                }
                event = receiver.recv() => event,
            };

            match event {
                Some(event) => self.handle(event).await,
                None => {
                    self.destroy().await;
                    break;
                }
            }
        }

        info!("Meeting coordinator stopped");
    }

    /// Drain everything currently queued. Returns how many events were handled.
    pub async fn process_pending(
        &mut self,
        receiver: &mut UnboundedReceiver<CoordinatorEvent>,
    ) -> usize {
        let mut handled = 0;
        while let Ok(event) = receiver.try_recv() {
            self.handle(event).await;
            handled += 1;
        }
        handled
    }

    pub async fn handle(&mut self, event: CoordinatorEvent) {
        if self.destroyed {
            debug!("Ignoring event after destroy: {:?}", event);
            return;
        }

        match event {
            CoordinatorEvent::Host(event) => self.on_host_event(event).await,
            CoordinatorEvent::Connection { generation, event } => {
                if !self.state.connection.is_current(generation) {
                    debug!("Dropping {:?} from stale link {}", event, generation);
                    return;
                }
                self.on_connection_event(event).await;
            }
            CoordinatorEvent::Conference { generation, event } => {
                if self.state.session_for(generation).is_none() {
                    debug!("Dropping {:?} from stale session {}", event.kind(), generation);
                    return;
                }
                self.on_conference_event(generation, event).await;
            }
            CoordinatorEvent::TrackStopped {
                generation,
                participant_id,
                route,
            } => {
                if !self.state.connection.is_current(generation) {
                    debug!("Dropping track-stopped for {} from stale link", route);
                    return;
                }
                self.state.router.on_track_stopped(&participant_id, route);
            }
        }
    }

    async fn on_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Init => self.init().await,
            HostEvent::ArgsUpdated(args) => self.update_args(args).await,
            HostEvent::PropsUpdated(update) => self.update_props(update),
            HostEvent::Inlet { inlet, data } => self.on_inlet(inlet, data).await,
            HostEvent::Destroy => self.destroy().await,
        }
    }

    async fn init(&mut self) {
        if self.initialized {
            debug!("Init ignored: already initialized");
            return;
        }
        self.initialized = true;

        info!(
            "Initializing: local source {} and output mix at {} Hz",
            self.local_source.stream_id(),
            self.local_source.sample_rate()
        );
        self.connect().await;
    }

    /// Open a fresh link unless one already exists
    async fn connect(&mut self) {
        if self.state.connection.is_live() {
            debug!("Connect ignored: link already exists");
            return;
        }

        if self.quality_dirty {
            let options = InitOptions::from_props(&self.config.props);
            if let Err(e) = self.client.init(&options) {
                self.report(MeetingError::Client(format!("init: {:#}", e)));
                return;
            }
            debug!(
                "Applied audio quality: {} bps",
                options.audio_quality.opus_max_average_bitrate
            );
            self.quality_dirty = false;
        }

        match self
            .state
            .connection
            .connect(self.client.as_ref(), &self.config.server, &self.dispatcher)
            .await
        {
            Ok(_) => {}
            Err(e) => self.report(e),
        }
    }

    async fn on_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Established => self.open_session().await,
            ConnectionEvent::Failed { reason } => {
                self.report(MeetingError::ConnectionFailed(reason));
                self.state.connection.on_failed();
                self.teardown(TeardownReason::LinkLost).await;
            }
            ConnectionEvent::Disconnected => {
                info!("Link disconnected");
                self.teardown(TeardownReason::LinkLost).await;
            }
        }
    }

    /// Negotiate and join the configured session on the established link
    async fn open_session(&mut self) {
        let Some(link) = self.state.connection.on_established() else {
            return;
        };
        let generation = self.state.connection.generation();

        // Nothing from a previous session may survive into this one
        if let Some(mut stale) = self.state.session.take() {
            stale.teardown().await;
        }
        self.state.router.teardown_all();

        let name = self.config.args.session_name.clone();
        let conference = match link.init_conference(&name, &ConferenceOptions::default()) {
            Ok(conference) => conference,
            Err(e) => {
                self.report(MeetingError::Client(format!(
                    "session '{}': {:#}",
                    name, e
                )));
                self.teardown(TeardownReason::Local).await;
                return;
            }
        };

        match SessionManager::new(
            &name,
            conference,
            &self.config.props.display_name,
            &self.dispatcher,
            generation,
        ) {
            Ok(session) => self.state.session = Some(session),
            Err(e) => {
                self.report(e);
                self.teardown(TeardownReason::Local).await;
            }
        }
    }

    async fn on_conference_event(&mut self, generation: u64, event: ConferenceEvent) {
        match event {
            ConferenceEvent::Joined => {
                let Some(session) = self.state.session_for(generation) else {
                    return;
                };
                if !session.mark_joined() {
                    debug!("Duplicate joined event ignored");
                    return;
                }
                info!("Joined session '{}'", session.session_id());

                if let Err(e) = session
                    .publish_local(self.client.as_ref(), self.local_source.clone())
                    .await
                {
                    error!("Failed to publish local audio: {}", e);
                    self.outputs.report_error(&e);
                }
                self.multiplexer.announce(session.conference());
            }
            ConferenceEvent::TrackAdded(track) => {
                match self.state.router.on_remote_track_added(track.as_ref()) {
                    Ok(Some((participant_id, route))) => {
                        track.on_stopped(self.dispatcher.track_stopped_callback(
                            generation,
                            participant_id,
                            route,
                        ));
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Remote track {} not routed: {}", track.track_id(), e),
                }
            }
            ConferenceEvent::TrackRemoved(track) => {
                self.state.router.on_remote_track_removed(track.as_ref());
            }
            ConferenceEvent::UserLeft { participant_id } => {
                self.state.router.on_user_left(&participant_id);
            }
            ConferenceEvent::MessageReceived(_) | ConferenceEvent::PrivateMessageReceived(_) => {
                if let Some(session) = self.state.session.as_ref() {
                    self.multiplexer.forward(&event, session);
                }
            }
        }
    }

    async fn on_inlet(&mut self, inlet: usize, data: HostPayload) {
        if inlet != INLET_MAIN {
            warn!("Ignoring data on unknown inlet {}", inlet);
            return;
        }

        let command = match MessageCommand::from_payload(data) {
            Ok(command) => command,
            Err(e) => {
                warn!("Dropping inbound payload: {}", e);
                return;
            }
        };

        let live = self.state.connection.is_live();
        let outcome = self
            .multiplexer
            .dispatch(command, live, self.state.session.as_ref());
        match outcome {
            Dispatch::Connect => self.connect().await,
            Dispatch::Announce(conference) => self.multiplexer.announce(conference),
            Dispatch::Delivered | Dispatch::Dropped => {}
        }
    }

    /// Switch sessions: full teardown, then a fresh link under the new name
    async fn update_args(&mut self, args: MeetingArgs) {
        info!(
            "Session name changed: '{}' -> '{}'",
            self.config.args.session_name, args.session_name
        );
        self.config.args = args;

        if !self.initialized && !self.state.connection.is_live() {
            return;
        }
        self.teardown(TeardownReason::Local).await;
        self.connect().await;
    }

    fn update_props(&mut self, update: PropsUpdate) {
        if let Some(name) = update.display_name {
            self.config.props.display_name = name;
            if let Some(session) = self.state.session.as_ref() {
                session.set_display_name(&self.config.props.display_name);
            }
        }

        if let Some(raw) = update.opus_max_average_bitrate {
            let bitrate = coerce_bitrate(&raw);
            if bitrate != self.config.props.opus_max_average_bitrate {
                self.config.props.opus_max_average_bitrate = bitrate;
                self.quality_dirty = true;
                info!("Bitrate set to {} bps, applied on next connection", bitrate);
            }
        }
    }

    /// Tear everything down in order. Safe to call at any time, any number of times.
    pub async fn teardown(&mut self, reason: TeardownReason) {
        let had_link = self.state.connection.begin_teardown();

        if let Some(mut session) = self.state.session.take() {
            session.teardown().await;
        }

        let routes = self.state.router.teardown_all();
        self.state
            .connection
            .release(reason == TeardownReason::Local)
            .await;

        if had_link || routes > 0 {
            info!(
                "Teardown complete ({:?}): {} audio routes released",
                reason, routes
            );
        }
    }

    async fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.teardown(TeardownReason::Local).await;
        self.destroyed = true;
        info!("Meeting destroyed");
    }

    fn report(&self, error: MeetingError) {
        error!("{}", error);
        self.outputs.report_error(&error);
    }
}

/// A running coordinator: feed it host events, read and write its audio ports
pub struct MeetingHandle {
    dispatcher: EventDispatcher,
    local_source: Arc<LocalAudioSource>,
    output_mix: Arc<OutputMix>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MeetingHandle {
    /// Queue a host event. Returns false once the coordinator has stopped.
    pub fn send(&self, event: HostEvent) -> bool {
        self.dispatcher.host(event)
    }

    pub fn dispatcher(&self) -> EventDispatcher {
        self.dispatcher.clone()
    }

    pub fn local_source(&self) -> Arc<LocalAudioSource> {
        self.local_source.clone()
    }

    pub fn output_mix(&self) -> Arc<OutputMix> {
        self.output_mix.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Destroy the meeting and wait for the event loop to exit
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.cancel.cancel();
        self.task.await.context("Coordinator task failed")?;
        Ok(())
    }
}
