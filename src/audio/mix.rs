//! Shared output mix
//! Sums every connected remote route into one output with basic clipping prevention

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};

use super::buffer::{lock_buffer, SampleBuffer};
use super::stream::RouteId;

/// Per-input buffering: 400ms absorbs network jitter without audible lag
const INPUT_BUFFER_MS: u32 = 400;

/// Writer side of one mix input, handed to a source tap
#[derive(Debug, Clone)]
pub struct MixInput {
    route: RouteId,
    buffer: Arc<Mutex<SampleBuffer>>,
}

impl MixInput {
    pub fn route(&self) -> RouteId {
        self.route
    }

    /// Queue decoded samples for mixing. Returns how many old samples were dropped.
    pub fn write(&self, samples: &[f32]) -> usize {
        lock_buffer(&self.buffer).push(samples)
    }
}

/// The single shared mixing point for remote audio
///
/// Only the participant router connects or disconnects inputs.
#[derive(Debug)]
pub struct OutputMix {
    inputs: Mutex<BTreeMap<RouteId, Arc<Mutex<SampleBuffer>>>>,
    gain: Mutex<f32>,
    sample_rate: u32,
}

impl OutputMix {
    pub fn new(sample_rate: u32) -> Self {
        info!("Output mix initialized at {} Hz", sample_rate);
        Self {
            inputs: Mutex::new(BTreeMap::new()),
            gain: Mutex::new(1.0),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Attach a route to the mix, returning the writer its tap feeds
    pub fn connect(&self, route: RouteId) -> MixInput {
        let mut inputs = self.inputs.lock().unwrap_or_else(PoisonError::into_inner);
        let buffer = inputs
            .entry(route)
            .or_insert_with(|| {
                Arc::new(Mutex::new(SampleBuffer::with_duration(
                    self.sample_rate,
                    INPUT_BUFFER_MS,
                )))
            })
            .clone();

        debug!("Mix input connected: {} ({} inputs)", route, inputs.len());
        MixInput { route, buffer }
    }

    /// Detach a route. Returns false if it was not connected.
    pub fn disconnect(&self, route: RouteId) -> bool {
        let mut inputs = self.inputs.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = inputs.remove(&route).is_some();
        if removed {
            debug!("Mix input disconnected: {} ({} inputs)", route, inputs.len());
        }
        removed
    }

    pub fn is_connected(&self, route: RouteId) -> bool {
        self.inputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&route)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn set_gain(&self, gain: f32) {
        *self.gain.lock().unwrap_or_else(PoisonError::into_inner) = gain.max(0.0);
    }

    pub fn gain(&self) -> f32 {
        *self.gain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pull `frames` samples from every input and sum them
    ///
    /// Inputs that run short contribute silence. Sums beyond ±1.0 are scaled
    /// down proportionally instead of hard clipped.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut mixed = vec![0.0f32; frames];
        let mut scratch = vec![0.0f32; frames];

        let inputs: Vec<Arc<Mutex<SampleBuffer>>> = self
            .inputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for input in &inputs {
            let written = lock_buffer(input).pop_into(&mut scratch);
            for (out, sample) in mixed.iter_mut().zip(&scratch[..written]) {
                *out += *sample;
            }
        }

        let gain = self.gain();
        for sample in mixed.iter_mut() {
            let sum = *sample * gain;
            let sum_abs = sum.abs();
            *sample = if sum_abs > 1.0 { sum / sum_abs } else { sum };
        }

        mixed
    }
}
