//! AND-join over one fresh value from each of a fixed set of streams.

use std::task::Waker;

use parking_lot::Mutex;

use crate::state::{ListenerId, StateStream};

pub(crate) struct JoinBarrier {
    state: Mutex<BarrierState>,
}

struct BarrierState {
    received: Vec<bool>,
    remaining: usize,
    granted: bool,
    outcome: Option<bool>,
    waker: Option<Waker>,
    subscriptions: Vec<(StateStream, ListenerId)>,
}

impl JoinBarrier {
    pub(crate) fn new(slots: usize) -> Self {
        Self {
            state: Mutex::new(BarrierState {
                received: vec![false; slots],
                remaining: slots,
                granted: true,
                outcome: None,
                waker: None,
                subscriptions: Vec::with_capacity(slots),
            }),
        }
    }

    /// Remember a listener so it can be removed once the barrier is done.
    ///
    /// If the barrier already resolved, the listener is removed right away.
    pub(crate) fn track(&self, stream: StateStream, id: ListenerId) {
        let mut state = self.state.lock();
        if state.outcome.is_some() {
            drop(state);
            stream.unsubscribe(id);
        } else {
            state.subscriptions.push((stream, id));
        }
    }

    /// Record the fresh value for `slot`. Later values for a filled slot are ignored.
    pub(crate) fn deliver(&self, slot: usize, granted: bool) {
        let (waker, subscriptions) = {
            let mut state = self.state.lock();
            if state.outcome.is_some() || state.received[slot] {
                return;
            }
            state.received[slot] = true;
            state.remaining -= 1;
            state.granted &= granted;
            if state.remaining > 0 {
                return;
            }
            state.outcome = Some(state.granted);
            (state.waker.take(), std::mem::take(&mut state.subscriptions))
        };
        for (stream, id) in subscriptions {
            stream.unsubscribe(id);
        }
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// The combined result, or registers `waker` to be woken with it.
    pub(crate) fn poll_outcome(&self, waker: &Waker) -> Option<bool> {
        let mut state = self.state.lock();
        if state.outcome.is_none() {
            match &state.waker {
                Some(existing) if existing.will_wake(waker) => {}
                _ => state.waker = Some(waker.clone()),
            }
        }
        state.outcome
    }

    pub(crate) fn outcome(&self) -> Option<bool> {
        self.state.lock().outcome
    }

    /// Remove every listener still attached.
    pub(crate) fn release(&self) {
        let subscriptions = std::mem::take(&mut self.state.lock().subscriptions);
        for (stream, id) in subscriptions {
            stream.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::noop_waker;

    #[test]
    fn test_and_of_all_slots() {
        let barrier = JoinBarrier::new(2);
        barrier.deliver(0, true);
        assert_eq!(barrier.outcome(), None);
        barrier.deliver(1, false);
        assert_eq!(barrier.outcome(), Some(false));
    }

    #[test]
    fn test_second_value_for_slot_is_ignored() {
        let barrier = JoinBarrier::new(2);
        barrier.deliver(0, false);
        barrier.deliver(0, true);
        barrier.deliver(1, true);
        assert_eq!(barrier.outcome(), Some(false));
    }

    #[test]
    fn test_resolves_once() {
        let barrier = JoinBarrier::new(1);
        barrier.deliver(0, true);
        barrier.deliver(0, false);
        assert_eq!(barrier.poll_outcome(&noop_waker()), Some(true));
    }

    #[test]
    fn test_resolution_releases_listeners() {
        let stream = StateStream::new("camera".into(), false);
        let barrier = JoinBarrier::new(1);
        let id = stream.subscribe_fresh(|_| |_, _| {});
        barrier.track(stream.clone(), id);
        assert_eq!(stream.listener_count(), 1);

        barrier.deliver(0, true);
        assert_eq!(stream.listener_count(), 0);
    }
}
