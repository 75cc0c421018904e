//! Fixed local audio source
//!
//! The host writes its input port frames here; the published local track reads
//! them back out. There is exactly one source per endpoint and it outlives
//! every connection.

use std::sync::{Arc, Mutex};

use log::info;

use super::buffer::{lock_buffer, SampleBuffer};
use super::stream::StreamId;

const LOCAL_BUFFER_MS: u32 = 400;

#[derive(Debug)]
pub struct LocalAudioSource {
    stream: StreamId,
    sample_rate: u32,
    buffer: Arc<Mutex<SampleBuffer>>,
}

impl LocalAudioSource {
    pub fn new(sample_rate: u32) -> Self {
        let stream = StreamId::new(format!("local-{}", uuid::Uuid::new_v4()));
        info!("Local audio source {} at {} Hz", stream, sample_rate);

        Self {
            stream,
            sample_rate,
            buffer: Arc::new(Mutex::new(SampleBuffer::with_duration(
                sample_rate,
                LOCAL_BUFFER_MS,
            ))),
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Host side: queue input frames
    pub fn write(&self, samples: &[f32]) -> usize {
        lock_buffer(&self.buffer).push(samples)
    }

    /// Publish side: drain queued frames into `out`
    pub fn read(&self, out: &mut [f32]) -> usize {
        lock_buffer(&self.buffer).pop_into(out)
    }

    pub fn buffered(&self) -> usize {
        lock_buffer(&self.buffer).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let source = LocalAudioSource::new(16000);
        source.write(&[0.1, 0.2, 0.3]);
        assert_eq!(source.buffered(), 3);

        let mut out = [0.0; 8];
        assert_eq!(source.read(&mut out), 3);
        assert_eq!(&out[..3], &[0.1, 0.2, 0.3]);
        assert_eq!(source.buffered(), 0);
    }

    #[test]
    fn test_stream_ids_are_unique() {
        let a = LocalAudioSource::new(48000);
        let b = LocalAudioSource::new(48000);
        assert_ne!(a.stream_id(), b.stream_id());
        assert!(a.stream_id().as_str().starts_with("local-"));
    }
}
