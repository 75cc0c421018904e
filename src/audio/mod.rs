// src/audio/mod.rs
//! Audio routing
//!
//! This module provides:
//! - Stream and route identities
//! - The fixed local source feeding the publish track
//! - The shared output mix receiving every remote stream
//! - The platform audio backend contract (sinks and taps)
//! - Per-participant resource sets and the participant router

pub mod backend;
pub mod buffer;
pub mod local_source;
pub mod mix;
pub mod resources;
pub mod router;
pub mod stream;

pub use backend::{AudioBackend, PlaybackSink, SourceTap};
pub use buffer::SampleBuffer;
pub use local_source::LocalAudioSource;
pub use mix::{MixInput, OutputMix};
pub use resources::{AudioResourceSet, AudioRoute};
pub use router::ParticipantAudioRouter;
pub use stream::{RouteId, StreamId};
