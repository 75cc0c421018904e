//! Bounded sample buffer shared between a writer and the mix
//! Keeps only the most recent samples when the reader falls behind

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::warn;

/// FIFO of mono f32 samples with a hard size limit
#[derive(Debug)]
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    max_samples: usize,
    dropped: u64,
}

impl SampleBuffer {
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
            dropped: 0,
        }
    }

    /// Buffer size for `duration_ms` of audio at `sample_rate`
    pub fn with_duration(sample_rate: u32, duration_ms: u32) -> Self {
        let max_samples = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        Self::new(max_samples)
    }

    /// Append samples, dropping the oldest on overflow. Returns how many were dropped.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        self.samples.extend(samples.iter().copied());

        let overflow = self.samples.len().saturating_sub(self.max_samples);
        if overflow > 0 {
            // Only the first overflow is logged
            if self.dropped == 0 {
                warn!(
                    "Sample buffer overflow: {} > {} samples, dropping oldest {}",
                    self.samples.len(),
                    self.max_samples,
                    overflow
                );
            }
            self.samples.drain(..overflow);
            self.dropped += overflow as u64;
        }

        overflow
    }

    /// Move up to `out.len()` samples into `out`. Returns how many were written.
    pub fn pop_into(&mut self, out: &mut [f32]) -> usize {
        let count = out.len().min(self.samples.len());
        for (slot, sample) in out.iter_mut().zip(self.samples.drain(..count)) {
            *slot = sample;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Total samples discarded because of overflow
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Lock a shared buffer, recovering the data if a writer panicked
pub(crate) fn lock_buffer(buffer: &Mutex<SampleBuffer>) -> MutexGuard<'_, SampleBuffer> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}
