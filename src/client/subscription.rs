//! Listener bookkeeping
//!
//! Every registration is recorded so removal is symmetric to subscription.

use std::fmt::Debug;

use log::debug;

use super::contract::ListenerId;

/// Listener ids registered on one handle, tagged with the event kind
#[derive(Debug)]
pub struct Subscriptions<K> {
    entries: Vec<(K, ListenerId)>,
}

impl<K: Copy + Debug> Subscriptions<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, kind: K, id: ListenerId) {
        self.entries.push((kind, id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kinds(&self) -> Vec<K> {
        self.entries.iter().map(|(kind, _)| *kind).collect()
    }

    /// Remove every recorded listener through `remove`; a second call is a no-op
    pub fn release(&mut self, mut remove: impl FnMut(ListenerId)) -> usize {
        let count = self.entries.len();
        for (kind, id) in self.entries.drain(..) {
            debug!("Removing {:?} listener {:?}", kind, id);
            remove(id);
        }
        count
    }
}

impl<K: Copy + Debug> Default for Subscriptions<K> {
    fn default() -> Self {
        Self::new()
    }
}
