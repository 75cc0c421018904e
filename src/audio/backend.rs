//! Platform audio collaborator
//!
//! Decoding and playback are delegated to the platform. The core only asks
//! for a playback sink (kept muted so the platform keeps delivering samples)
//! and a source tap per remote stream.

use anyhow::Result;

use super::mix::MixInput;
use super::stream::StreamId;

/// Muted playback element bound to a remote stream
pub trait PlaybackSink: Send {
    fn stream_id(&self) -> &StreamId;

    fn set_muted(&mut self, muted: bool);

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);
}

/// Audio node sourcing a remote stream into the output mix
pub trait SourceTap: Send {
    fn stream_id(&self) -> &StreamId;

    /// Start feeding decoded samples into `input`
    fn connect(&mut self, input: MixInput);

    fn disconnect(&mut self);
}

pub trait AudioBackend: Send + Sync {
    fn create_sink(&self, stream: &StreamId) -> Result<Box<dyn PlaybackSink>>;

    fn create_tap(&self, stream: &StreamId) -> Result<Box<dyn SourceTap>>;
}
