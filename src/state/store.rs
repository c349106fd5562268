//! Map from capability name to its state stream.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::stream::{StateSnapshot, StateStream};
use crate::status::StatusSource;
use crate::types::CapabilityName;

/// Single source of truth for capability state.
///
/// Streams are created lazily and memoised: repeated lookups of one name
/// return handles to the same stream, and the host status is queried only
/// when that stream is first created. Creation goes through the map entry
/// API, so the check-then-insert is atomic per key. The host status is
/// queried before the map is locked, so a [`StatusSource`] may itself read
/// the store.
pub struct StateStore {
    streams: DashMap<CapabilityName, StateStream>,
    status: Arc<dyn StatusSource>,
}

impl StateStore {
    pub fn new(status: Arc<dyn StatusSource>) -> Self {
        Self::with_capacity(status, 0)
    }

    pub fn with_capacity(status: Arc<dyn StatusSource>, capacity: usize) -> Self {
        Self {
            streams: DashMap::with_capacity(capacity),
            status,
        }
    }

    /// The stream for `name`, seeded with the host status on first access.
    pub fn stream_for(&self, name: &CapabilityName) -> StateStream {
        if let Some(stream) = self.streams.get(name) {
            return stream.value().clone();
        }
        // Queried outside the map lock; the source may read the store.
        let seed = self.status.current_status(name);
        match self.streams.entry(name.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                log::debug!("Created state stream for {} (seed: {})", name, seed);
                entry
                    .insert(StateStream::new(name.clone(), seed))
                    .value()
                    .clone()
            }
        }
    }

    /// Push `granted` as the new current value of `name`.
    ///
    /// The value is forwarded as-is; the host status is not consulted. A name
    /// nobody has observed yet gets a stream seeded with `granted`.
    pub fn publish(&self, name: &CapabilityName, granted: bool) {
        let stream = match self.streams.entry(name.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                log::debug!("Created state stream for {} from delivery ({})", name, granted);
                entry.insert(StateStream::new(name.clone(), granted));
                return;
            }
        };
        // The map guard is released here; listeners may call back into the store.
        stream.push(granted);
    }

    /// Host-reported status, bypassing the streams.
    pub fn current_status(&self, name: &CapabilityName) -> bool {
        self.status.current_status(name)
    }

    pub fn contains(&self, name: &CapabilityName) -> bool {
        self.streams.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Names with a stream, sorted.
    pub fn names(&self) -> Vec<CapabilityName> {
        let mut names: Vec<CapabilityName> =
            self.streams.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshots of every stream, sorted by name.
    pub fn snapshots(&self) -> Vec<StateSnapshot> {
        let streams: Vec<StateStream> =
            self.streams.iter().map(|entry| entry.value().clone()).collect();
        let mut snapshots: Vec<StateSnapshot> = streams.iter().map(StateStream::snapshot).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("streams", &self.streams.len())
            .finish()
    }
}
