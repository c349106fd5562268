//! Hot, replayable state stream for a single capability.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures::channel::mpsc;
use futures::Stream;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::types::CapabilityName;

/// Callback invoked with `(revision, granted)` for every delivered value.
pub type Listener = Arc<dyn Fn(u64, bool) + Send + Sync>;

/// Handle identifying a registered listener on one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Point-in-time view of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub name: CapabilityName,
    pub granted: bool,
    /// Number of values pushed since the seed (the seed is revision 0).
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

struct StreamInner {
    current: bool,
    revision: u64,
    updated_at: DateTime<Utc>,
    next_listener: u64,
    listeners: Vec<(ListenerId, Listener)>,
    queue: VecDeque<Delivery>,
    emitting: bool,
}

/// A value waiting to be handed to listeners.
enum Delivery {
    /// A pushed value, for every listener registered before the push.
    Push {
        revision: u64,
        granted: bool,
        /// Listener ids below this existed when the value was pushed.
        bound: u64,
    },
    /// The current value replayed to one new listener.
    Replay {
        id: ListenerId,
        revision: u64,
        granted: bool,
    },
}

/// Current value plus an ordered list of listeners.
///
/// Cloning yields another handle to the same stream; use
/// [`StateStream::ptr_eq`] to compare identity. Deliveries are serialized
/// per stream: every listener sees values in revision order, even when a
/// listener pushes to its own stream or several threads push at once. A
/// push made while another caller is delivering is queued and handed out
/// by that caller. Listeners are invoked outside the internal lock, so a
/// listener may subscribe, unsubscribe or read the stream it is attached to.
#[derive(Clone)]
pub struct StateStream {
    name: CapabilityName,
    inner: Arc<Mutex<StreamInner>>,
}

impl StateStream {
    pub(crate) fn new(name: CapabilityName, seed: bool) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(StreamInner {
                current: seed,
                revision: 0,
                updated_at: Utc::now(),
                next_listener: 0,
                listeners: Vec::new(),
                queue: VecDeque::new(),
                emitting: false,
            })),
        }
    }

    pub fn name(&self) -> &CapabilityName {
        &self.name
    }

    /// The most recent value.
    pub fn current(&self) -> bool {
        self.inner.lock().current
    }

    pub fn revision(&self) -> u64 {
        self.inner.lock().revision
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.lock();
        StateSnapshot {
            name: self.name.clone(),
            granted: inner.current,
            revision: inner.revision,
            updated_at: inner.updated_at,
        }
    }

    /// Whether both handles refer to the same stream.
    pub fn ptr_eq(&self, other: &StateStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Register a listener and replay the current value to it.
    ///
    /// The replay is queued behind any value still being delivered, so it
    /// arrives before every later push. Outside such a delivery it runs
    /// before this call returns.
    pub fn subscribe(&self, listener: impl Fn(u64, bool) + Send + Sync + 'static) -> ListenerId {
        let mut inner = self.inner.lock();
        let id = Self::register(&mut inner, Arc::new(listener));
        let replay = Delivery::Replay {
            id,
            revision: inner.revision,
            granted: inner.current,
        };
        self.schedule(inner, replay);
        id
    }

    /// Register a listener that only sees values pushed after this call.
    ///
    /// `make` receives the revision current at registration time and builds
    /// the listener; the marker is read under the same lock the listener is
    /// registered with, so no push can fall between the two. The first value
    /// the listener receives is always revision `marker + 1`. `make` runs
    /// under that lock and must not touch this stream.
    pub fn subscribe_fresh<F, L>(&self, make: F) -> ListenerId
    where
        F: FnOnce(u64) -> L,
        L: Fn(u64, bool) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let marker = inner.revision;
        let listener: Listener = Arc::new(make(marker));
        Self::register(&mut inner, listener)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        inner.listeners.len() != before
    }

    /// Append a new current value and notify listeners in subscription order.
    pub(crate) fn push(&self, granted: bool) {
        let mut inner = self.inner.lock();
        inner.revision += 1;
        inner.current = granted;
        inner.updated_at = Utc::now();
        let delivery = Delivery::Push {
            revision: inner.revision,
            granted,
            bound: inner.next_listener,
        };
        log::trace!("{} -> {} (revision {})", self.name, granted, inner.revision);
        self.schedule(inner, delivery);
    }

    /// Asynchronous view: the current value followed by every later value.
    pub fn updates(&self) -> StateUpdates {
        let (tx, rx) = mpsc::unbounded();
        let id = self.subscribe(move |_, granted| {
            // Receiver gone means the StateUpdates is being dropped.
            let _ = tx.unbounded_send(granted);
        });
        StateUpdates {
            rx,
            stream: self.clone(),
            id,
        }
    }

    fn register(inner: &mut StreamInner, listener: Listener) -> ListenerId {
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, listener));
        id
    }

    /// Queue `delivery`, then drain the queue unless another caller already is.
    fn schedule(&self, mut inner: MutexGuard<'_, StreamInner>, delivery: Delivery) {
        inner.queue.push_back(delivery);
        if inner.emitting {
            return;
        }
        inner.emitting = true;
        drop(inner);

        let _guard = EmitGuard(&self.inner);
        loop {
            let (revision, granted, targets) = {
                let mut inner = self.inner.lock();
                let Some(delivery) = inner.queue.pop_front() else {
                    inner.emitting = false;
                    return;
                };
                match delivery {
                    Delivery::Push {
                        revision,
                        granted,
                        bound,
                    } => {
                        let targets: Vec<Listener> = inner
                            .listeners
                            .iter()
                            .filter(|(id, _)| id.0 < bound)
                            .map(|(_, listener)| listener.clone())
                            .collect();
                        (revision, granted, targets)
                    }
                    Delivery::Replay {
                        id,
                        revision,
                        granted,
                    } => {
                        let targets: Vec<Listener> = inner
                            .listeners
                            .iter()
                            .filter(|(listener_id, _)| *listener_id == id)
                            .map(|(_, listener)| listener.clone())
                            .collect();
                        (revision, granted, targets)
                    }
                }
            };
            for listener in targets {
                listener(revision, granted);
            }
        }
    }
}

/// Releases the emitter role if a listener panics mid-delivery.
struct EmitGuard<'a>(&'a Mutex<StreamInner>);

impl Drop for EmitGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut inner = self.0.lock();
            inner.emitting = false;
            inner.queue.clear();
        }
    }
}

impl fmt::Debug for StateStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StateStream")
            .field("name", &self.name)
            .field("current", &inner.current)
            .field("revision", &inner.revision)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

/// [`Stream`] of values from one [`StateStream`]. Dropping it unsubscribes.
pub struct StateUpdates {
    rx: mpsc::UnboundedReceiver<bool>,
    stream: StateStream,
    id: ListenerId,
}

impl Stream for StateUpdates {
    type Item = bool;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<bool>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl Drop for StateUpdates {
    fn drop(&mut self) {
        self.stream.unsubscribe(self.id);
    }
}
