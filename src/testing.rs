// In-memory stand-ins for the conferencing client and the platform audio
// backend. Every side effect is appended to a shared call log so tests can
// assert ordering.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::audio::{
    AudioBackend, LocalAudioSource, MixInput, PlaybackSink, SourceTap, StreamId,
};
use crate::client::{
    Conference, ConferenceClient, ConferenceEvent, ConferenceEventKind, ConferenceOptions,
    Connection, ConnectionEvent, ConnectionEventKind, Listener, ListenerId, LocalTrack,
    MediaKind, Participant, RemoteTrack, StopCallback,
};
use crate::config::{InitOptions, ServerOptions};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered record of every call made into the fakes
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn record(&self, entry: &str) {
        lock(&self.entries).push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    /// Index of the first occurrence of `entry`
    pub fn position(&self, entry: &str) -> Option<usize> {
        lock(&self.entries).iter().position(|e| e == entry)
    }

    /// Index of the last occurrence of `entry`
    pub fn last_position(&self, entry: &str) -> Option<usize> {
        lock(&self.entries).iter().rposition(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        lock(&self.entries).iter().filter(|e| *e == entry).count()
    }
}

/// Listener table shared by the fake connection and conference
struct ListenerTable<K, E> {
    next_id: u64,
    listeners: Vec<(ListenerId, K, Listener<E>)>,
}

impl<K: Copy + PartialEq, E: Clone> ListenerTable<K, E> {
    fn new() -> Self {
        Self {
            next_id: 1,
            listeners: Vec::new(),
        }
    }

    fn add(&mut self, kind: K, listener: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, listener));
        id
    }

    fn remove(&mut self, id: ListenerId) {
        self.listeners.retain(|(existing, _, _)| *existing != id);
    }

    fn matching(&self, kind: K) -> Vec<Listener<E>> {
        self.listeners
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, listener)| listener.clone())
            .collect()
    }
}

pub struct FakeClient {
    log: CallLog,
    connections: Mutex<Vec<Arc<FakeConnection>>>,
    local_tracks: Mutex<Vec<Arc<FakeLocalTrack>>>,
    init_options: Mutex<Vec<InitOptions>>,
    fail_next_connect: AtomicBool,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            connections: Mutex::new(Vec::new()),
            local_tracks: Mutex::new(Vec::new()),
            init_options: Mutex::new(Vec::new()),
            fail_next_connect: AtomicBool::new(false),
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// The next created link rejects `connect()`
    pub fn fail_next_connect(&self) {
        self.fail_next_connect.store(true, Ordering::SeqCst);
    }

    pub fn new_connection(&self) -> Arc<FakeConnection> {
        let connection = Arc::new(FakeConnection {
            log: self.log.clone(),
            listeners: Mutex::new(ListenerTable::new()),
            conference: Mutex::new(None),
            fail_connect: self.fail_next_connect.swap(false, Ordering::SeqCst),
            connected: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        });
        lock(&self.connections).push(connection.clone());
        connection
    }

    pub fn last_connection(&self) -> Option<Arc<FakeConnection>> {
        lock(&self.connections).last().cloned()
    }

    pub fn connection_count(&self) -> usize {
        lock(&self.connections).len()
    }

    pub fn local_tracks(&self) -> Vec<Arc<FakeLocalTrack>> {
        lock(&self.local_tracks).clone()
    }

    pub fn init_options(&self) -> Vec<InitOptions> {
        lock(&self.init_options).clone()
    }
}

impl ConferenceClient for FakeClient {
    fn init(&self, options: &InitOptions) -> Result<()> {
        self.log.record("client:init");
        lock(&self.init_options).push(*options);
        Ok(())
    }

    fn create_connection(&self, _server: &ServerOptions) -> Result<Arc<dyn Connection>> {
        self.log.record("client:create_connection");
        Ok(self.new_connection())
    }

    fn create_local_audio_track(&self, source: Arc<LocalAudioSource>) -> Result<Arc<dyn LocalTrack>> {
        self.log.record("client:create_local_audio_track");
        let mut tracks = lock(&self.local_tracks);
        let track = Arc::new(FakeLocalTrack {
            id: format!("{}-track{}", source.stream_id(), tracks.len() + 1),
            log: self.log.clone(),
            muted: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
        });
        tracks.push(track.clone());
        Ok(track)
    }
}

pub struct FakeConnection {
    log: CallLog,
    listeners: Mutex<ListenerTable<ConnectionEventKind, ConnectionEvent>>,
    conference: Mutex<Option<Arc<FakeConference>>>,
    fail_connect: bool,
    connected: AtomicBool,
    disconnected: AtomicBool,
}

impl FakeConnection {
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).listeners.len()
    }

    /// Deliver an event to every listener registered for its kind
    pub fn emit(&self, event: ConnectionEvent) {
        let listeners = lock(&self.listeners).matching(event.kind());
        for listener in listeners {
            listener(event.clone());
        }
    }

    pub fn was_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn was_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// The most recently negotiated session
    pub fn conference(&self) -> Option<Arc<FakeConference>> {
        lock(&self.conference).clone()
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn add_listener(
        &self,
        kind: ConnectionEventKind,
        listener: Listener<ConnectionEvent>,
    ) -> ListenerId {
        self.log.record("connection:add_listener");
        lock(&self.listeners).add(kind, listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.log.record("connection:remove_listener");
        lock(&self.listeners).remove(id);
    }

    async fn connect(&self) -> Result<()> {
        self.log.record("connection:connect");
        if self.fail_connect {
            return Err(anyhow!("connection refused"));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.log.record("connection:disconnect");
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn init_conference(
        &self,
        name: &str,
        _options: &ConferenceOptions,
    ) -> Result<Arc<dyn Conference>> {
        self.log.record("connection:init_conference");
        let conference = Arc::new(FakeConference::new(name, self.log.clone()));
        *lock(&self.conference) = Some(conference.clone());
        Ok(conference)
    }
}

pub struct FakeConference {
    name: String,
    log: CallLog,
    listeners: Mutex<ListenerTable<ConferenceEventKind, ConferenceEvent>>,
    participants: Mutex<Vec<Participant>>,
    display_name: Mutex<Option<String>>,
    join_requested: AtomicBool,
    added_tracks: Mutex<Vec<String>>,
    sent_messages: Mutex<Vec<(String, Option<String>)>>,
    delivered: AtomicUsize,
}

impl FakeConference {
    pub fn new(name: &str, log: CallLog) -> Self {
        Self {
            name: name.to_string(),
            log,
            listeners: Mutex::new(ListenerTable::new()),
            participants: Mutex::new(Vec::new()),
            display_name: Mutex::new(None),
            join_requested: AtomicBool::new(false),
            added_tracks: Mutex::new(Vec::new()),
            sent_messages: Mutex::new(Vec::new()),
            delivered: AtomicUsize::new(0),
        }
    }

    pub fn add_participant(&self, participant: Participant) {
        lock(&self.participants).push(participant);
    }

    pub fn remove_participant(&self, id: &str) {
        lock(&self.participants).retain(|p| p.id != id);
    }

    pub fn rename_participant(&self, id: &str, name: &str) {
        if let Some(participant) = lock(&self.participants).iter_mut().find(|p| p.id == id) {
            participant.display_name = Some(name.to_string());
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).listeners.len()
    }

    /// Deliver an event to every listener registered for its kind
    pub fn emit(&self, event: ConferenceEvent) {
        let listeners = lock(&self.listeners).matching(event.kind());
        for listener in listeners {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            listener(event.clone());
        }
    }

    /// How many listener invocations happened so far
    pub fn delivered_events(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn display_name(&self) -> Option<String> {
        lock(&self.display_name).clone()
    }

    pub fn join_requested(&self) -> bool {
        self.join_requested.load(Ordering::SeqCst)
    }

    pub fn added_tracks(&self) -> Vec<String> {
        lock(&self.added_tracks).clone()
    }

    pub fn sent_messages(&self) -> Vec<(String, Option<String>)> {
        lock(&self.sent_messages).clone()
    }
}

#[async_trait]
impl Conference for FakeConference {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_listener(
        &self,
        kind: ConferenceEventKind,
        listener: Listener<ConferenceEvent>,
    ) -> ListenerId {
        self.log.record("conference:add_listener");
        lock(&self.listeners).add(kind, listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.log.record("conference:remove_listener");
        lock(&self.listeners).remove(id);
    }

    fn set_display_name(&self, name: &str) {
        self.log.record("conference:set_display_name");
        *lock(&self.display_name) = Some(name.to_string());
    }

    fn join(&self) -> Result<()> {
        self.log.record("conference:join");
        self.join_requested.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn leave(&self) -> Result<()> {
        self.log.record("conference:leave");
        // The real client reports its own departure while leaving
        self.emit(ConferenceEvent::UserLeft {
            participant_id: "local".to_string(),
        });
        Ok(())
    }

    async fn add_track(&self, track: Arc<dyn LocalTrack>) -> Result<()> {
        self.log.record("conference:add_track");
        lock(&self.added_tracks).push(track.track_id().to_string());
        Ok(())
    }

    fn participants(&self) -> Vec<Participant> {
        lock(&self.participants).clone()
    }

    fn participant_by_id(&self, id: &str) -> Option<Participant> {
        lock(&self.participants).iter().find(|p| p.id == id).cloned()
    }

    fn send_message(&self, text: &str, recipient: Option<&str>) -> Result<()> {
        self.log.record("conference:send_message");
        lock(&self.sent_messages).push((text.to_string(), recipient.map(str::to_string)));
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeLocalTrack {
    id: String,
    log: CallLog,
    muted: AtomicBool,
    disposed: AtomicBool,
}

impl FakeLocalTrack {
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalTrack for FakeLocalTrack {
    fn track_id(&self) -> &str {
        &self.id
    }

    async fn unmute(&self) -> Result<()> {
        self.log.record("track:unmute");
        self.muted.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn mute(&self) -> Result<()> {
        self.log.record("track:mute");
        self.muted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn dispose(&self) -> Result<()> {
        self.log.record("track:dispose");
        self.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeRemoteTrack {
    id: String,
    participant_id: Option<String>,
    kind: MediaKind,
    local: bool,
    stream: StreamId,
    on_stopped: Mutex<Option<StopCallback>>,
}

impl std::fmt::Debug for FakeRemoteTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeRemoteTrack")
            .field("id", &self.id)
            .field("participant_id", &self.participant_id)
            .field("stream", &self.stream)
            .finish()
    }
}

impl FakeRemoteTrack {
    fn build(
        id: &str,
        participant_id: Option<&str>,
        kind: MediaKind,
        local: bool,
        stream: &str,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            participant_id: participant_id.map(str::to_string),
            kind,
            local,
            stream: StreamId::from(stream),
            on_stopped: Mutex::new(None),
        })
    }

    pub fn audio(id: &str, participant_id: Option<&str>, stream: &str) -> Arc<Self> {
        Self::build(id, participant_id, MediaKind::Audio, false, stream)
    }

    pub fn local_audio(id: &str, stream: &str) -> Arc<Self> {
        Self::build(id, Some("local"), MediaKind::Audio, true, stream)
    }

    pub fn video(id: &str, participant_id: Option<&str>, stream: &str) -> Arc<Self> {
        Self::build(id, participant_id, MediaKind::Video, false, stream)
    }

    pub fn has_stop_callback(&self) -> bool {
        lock(&self.on_stopped).is_some()
    }

    /// Fire the stop callback, if one was registered
    pub fn stop(&self) -> bool {
        let callback = lock(&self.on_stopped).take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl RemoteTrack for FakeRemoteTrack {
    fn track_id(&self) -> &str {
        &self.id
    }

    fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    fn media_kind(&self) -> MediaKind {
        self.kind
    }

    fn is_local(&self) -> bool {
        self.local
    }

    fn stream_id(&self) -> &StreamId {
        &self.stream
    }

    fn on_stopped(&self, callback: StopCallback) {
        *lock(&self.on_stopped) = Some(callback);
    }
}

#[derive(Debug, Default)]
struct SinkRecord {
    muted: bool,
    playing: bool,
    paused: bool,
}

#[derive(Debug, Default)]
struct TapRecord {
    stream: String,
    input: Option<MixInput>,
    connected: bool,
    disconnected: bool,
}

struct FakeSink {
    stream: StreamId,
    record: Arc<Mutex<SinkRecord>>,
}

impl PlaybackSink for FakeSink {
    fn stream_id(&self) -> &StreamId {
        &self.stream
    }

    fn set_muted(&mut self, muted: bool) {
        lock(&self.record).muted = muted;
    }

    fn play(&mut self) -> Result<()> {
        lock(&self.record).playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        let mut record = lock(&self.record);
        record.playing = false;
        record.paused = true;
    }
}

struct FakeTap {
    stream: StreamId,
    record: Arc<Mutex<TapRecord>>,
}

impl SourceTap for FakeTap {
    fn stream_id(&self) -> &StreamId {
        &self.stream
    }

    fn connect(&mut self, input: MixInput) {
        let mut record = lock(&self.record);
        record.input = Some(input);
        record.connected = true;
    }

    fn disconnect(&mut self) {
        let mut record = lock(&self.record);
        record.input = None;
        record.disconnected = true;
    }
}

/// Audio backend tracking every sink and tap it hands out
#[derive(Default)]
pub struct FakeAudioBackend {
    sinks: Mutex<Vec<Arc<Mutex<SinkRecord>>>>,
    taps: Mutex<Vec<Arc<Mutex<TapRecord>>>>,
    fail_next_tap: AtomicBool,
}

impl FakeAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_tap(&self) {
        self.fail_next_tap.store(true, Ordering::SeqCst);
    }

    pub fn created_sinks(&self) -> usize {
        lock(&self.sinks).len()
    }

    pub fn created_taps(&self) -> usize {
        lock(&self.taps).len()
    }

    /// Sinks created and not yet paused
    pub fn active_sinks(&self) -> usize {
        lock(&self.sinks).iter().filter(|s| !lock(s).paused).count()
    }

    /// Taps connected to the mix and not yet disconnected
    pub fn connected_taps(&self) -> usize {
        lock(&self.taps)
            .iter()
            .filter(|t| {
                let tap = lock(t);
                tap.connected && !tap.disconnected
            })
            .count()
    }

    pub fn sink_muted(&self, index: usize) -> bool {
        lock(&self.sinks)
            .get(index)
            .map_or(false, |s| lock(s).muted)
    }

    pub fn sink_playing(&self, index: usize) -> bool {
        lock(&self.sinks)
            .get(index)
            .map_or(false, |s| lock(s).playing)
    }

    /// Every sink paused and every tap disconnected
    pub fn all_released(&self) -> bool {
        self.active_sinks() == 0 && self.connected_taps() == 0
    }

    /// Push decoded samples through the live tap of `stream`
    pub fn feed(&self, stream: &str, samples: &[f32]) -> bool {
        let taps = lock(&self.taps);
        for tap in taps.iter() {
            let tap = lock(tap);
            if tap.stream == stream {
                if let Some(input) = tap.input.as_ref() {
                    input.write(samples);
                    return true;
                }
            }
        }
        false
    }
}

impl AudioBackend for FakeAudioBackend {
    fn create_sink(&self, stream: &StreamId) -> Result<Box<dyn PlaybackSink>> {
        let record = Arc::new(Mutex::new(SinkRecord::default()));
        lock(&self.sinks).push(record.clone());
        Ok(Box::new(FakeSink {
            stream: stream.clone(),
            record,
        }))
    }

    fn create_tap(&self, stream: &StreamId) -> Result<Box<dyn SourceTap>> {
        if self.fail_next_tap.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("no audio context for {}", stream));
        }
        let record = Arc::new(Mutex::new(TapRecord {
            stream: stream.to_string(),
            ..TapRecord::default()
        }));
        lock(&self.taps).push(record.clone());
        Ok(Box::new(FakeTap {
            stream: stream.clone(),
            record,
        }))
    }
}
