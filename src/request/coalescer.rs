//! Turns "ask the host for these capabilities" into one single-shot future.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use super::barrier::JoinBarrier;
use crate::error::{PermissionError, Result};
use crate::state::StateStore;
use crate::types::CapabilityName;

/// Issues coalesced permission requests against a [`StateStore`].
///
/// Each call to [`request`](Self::request) performs its own
/// check-then-trigger sequence; independent calls are not merged.
#[derive(Debug, Clone)]
pub struct RequestCoalescer {
    store: Arc<StateStore>,
}

impl RequestCoalescer {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Request `names`, invoking `trigger` at most once.
    ///
    /// Names are deduplicated keeping first-occurrence order, and `trigger`
    /// receives that list. If every stream already reports granted the
    /// returned future is ready with `true` and `trigger` is not called.
    /// Otherwise a fresh-value listener is attached to every stream before
    /// `trigger` runs, and the future resolves with the AND of the next value
    /// each stream receives.
    pub fn request<I, N, T>(&self, names: I, trigger: T) -> Result<PermissionRequest>
    where
        I: IntoIterator<Item = N>,
        N: Into<CapabilityName>,
        T: FnOnce(&[CapabilityName]),
    {
        let names = dedup(names);
        if names.is_empty() {
            return Err(PermissionError::EmptyRequest);
        }

        let streams: Vec<_> = names.iter().map(|name| self.store.stream_for(name)).collect();
        if streams.iter().all(|stream| stream.current()) {
            log::debug!("Already granted, not prompting: {:?}", names);
            return Ok(PermissionRequest::granted());
        }

        let barrier = Arc::new(JoinBarrier::new(streams.len()));
        for (slot, stream) in streams.into_iter().enumerate() {
            let weak: Weak<JoinBarrier> = Arc::downgrade(&barrier);
            let id = stream.subscribe_fresh(move |marker| {
                move |revision, granted| {
                    // Only the value pushed right after subscription answers.
                    if revision != marker + 1 {
                        return;
                    }
                    if let Some(barrier) = weak.upgrade() {
                        barrier.deliver(slot, granted);
                    }
                }
            });
            barrier.track(stream, id);
        }

        log::debug!("Prompting host for {:?}", names);
        trigger(&names);
        Ok(PermissionRequest::pending(barrier))
    }
}

fn dedup<I, N>(names: I) -> Vec<CapabilityName>
where
    I: IntoIterator<Item = N>,
    N: Into<CapabilityName>,
{
    let mut unique: Vec<CapabilityName> = Vec::new();
    for name in names {
        let name = name.into();
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

/// Outcome of one permission request.
///
/// Resolves exactly once. A request whose host never answers never
/// resolves; impose a timeout at the call site if that matters. Dropping
/// the future detaches it from every stream.
#[must_use = "futures do nothing unless polled"]
pub struct PermissionRequest {
    state: RequestState,
}

enum RequestState {
    Ready(bool),
    Pending(Arc<JoinBarrier>),
}

impl PermissionRequest {
    fn granted() -> Self {
        Self {
            state: RequestState::Ready(true),
        }
    }

    fn pending(barrier: Arc<JoinBarrier>) -> Self {
        Self {
            state: RequestState::Pending(barrier),
        }
    }

    /// The result if already known, without polling.
    pub fn outcome(&self) -> Option<bool> {
        match &self.state {
            RequestState::Ready(granted) => Some(*granted),
            RequestState::Pending(barrier) => barrier.outcome(),
        }
    }

    /// Whether the host prompt was skipped because everything was granted.
    pub fn is_fast_path(&self) -> bool {
        matches!(self.state, RequestState::Ready(_))
    }
}

impl Future for PermissionRequest {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        match &self.state {
            RequestState::Ready(granted) => Poll::Ready(*granted),
            RequestState::Pending(barrier) => match barrier.poll_outcome(cx.waker()) {
                Some(granted) => Poll::Ready(granted),
                None => Poll::Pending,
            },
        }
    }
}

impl Drop for PermissionRequest {
    fn drop(&mut self) {
        if let RequestState::Pending(barrier) = &self.state {
            barrier.release();
        }
    }
}

impl std::fmt::Debug for PermissionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionRequest")
            .field("outcome", &self.outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::HostStatusTable;
    use std::cell::Cell;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn coalescer(table: &HostStatusTable) -> (Arc<StateStore>, RequestCoalescer) {
        let store = Arc::new(StateStore::new(Arc::new(table.clone())));
        (store.clone(), RequestCoalescer::new(store))
    }

    #[test]
    fn test_fast_path_skips_trigger() {
        let table = HostStatusTable::new();
        table.grant("camera");
        let (_, coalescer) = coalescer(&table);

        let calls = Cell::new(0);
        let request = coalescer
            .request(["camera"], |_| calls.set(calls.get() + 1))
            .unwrap();

        assert!(request.is_fast_path());
        assert_eq!(calls.get(), 0);
        let mut fut = task::spawn(request);
        assert_ready_eq!(fut.poll(), true);
    }

    #[test]
    fn test_empty_request_is_rejected() {
        let (_, coalescer) = coalescer(&HostStatusTable::new());
        let err = coalescer
            .request(Vec::<CapabilityName>::new(), |_| {})
            .unwrap_err();
        assert!(matches!(err, PermissionError::EmptyRequest));
    }

    #[test]
    fn test_single_name_resolves_with_delivery() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        let calls = Cell::new(0);
        let mut fut = task::spawn(
            coalescer
                .request(["camera"], |names| {
                    assert_eq!(names, [CapabilityName::from("camera")]);
                    calls.set(calls.get() + 1);
                })
                .unwrap(),
        );
        assert_eq!(calls.get(), 1);
        assert_pending!(fut.poll());

        store.publish(&"camera".into(), true);
        assert!(fut.is_woken());
        assert_ready_eq!(fut.poll(), true);
    }

    #[test]
    fn test_single_name_denied() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        let mut fut = task::spawn(coalescer.request(["camera"], |_| {}).unwrap());
        assert_pending!(fut.poll());

        // Same value as the seed still counts as a fresh answer.
        store.publish(&"camera".into(), false);
        assert_ready_eq!(fut.poll(), false);
    }

    #[test]
    fn test_both_granted_in_either_order() {
        for order in [["a", "b"], ["b", "a"]] {
            let (store, coalescer) = coalescer(&HostStatusTable::new());
            let mut fut = task::spawn(coalescer.request(["a", "b"], |_| {}).unwrap());

            store.publish(&order[0].into(), true);
            assert_pending!(fut.poll());
            store.publish(&order[1].into(), true);
            assert_ready_eq!(fut.poll(), true);
        }
    }

    #[test]
    fn test_any_denial_yields_false_in_either_order() {
        let cases = [
            (("a", false), ("b", true)),
            (("b", true), ("a", false)),
            (("a", false), ("b", false)),
        ];
        for (first, second) in cases {
            let (store, coalescer) = coalescer(&HostStatusTable::new());
            let mut fut = task::spawn(coalescer.request(["a", "b"], |_| {}).unwrap());

            store.publish(&first.0.into(), first.1);
            assert_pending!(fut.poll());
            store.publish(&second.0.into(), second.1);
            assert_ready_eq!(fut.poll(), false);
        }
    }

    #[test]
    fn test_partially_granted_set_still_prompts() {
        let table = HostStatusTable::new();
        table.grant("a");
        let (store, coalescer) = coalescer(&table);

        let calls = Cell::new(0);
        let mut fut = task::spawn(
            coalescer
                .request(["a", "b"], |_| calls.set(calls.get() + 1))
                .unwrap(),
        );
        assert_eq!(calls.get(), 1);

        store.publish(&"b".into(), true);
        assert_pending!(fut.poll());
        store.publish(&"a".into(), true);
        assert_ready_eq!(fut.poll(), true);
    }

    #[test]
    fn test_publish_before_request_is_not_a_fresh_value() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        store.publish(&"camera".into(), false);

        let mut fut = task::spawn(coalescer.request(["camera"], |_| {}).unwrap());
        assert_pending!(fut.poll());

        store.publish(&"camera".into(), true);
        assert_ready_eq!(fut.poll(), true);
    }

    #[test]
    fn test_synchronous_host_answer_inside_trigger() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        let request = coalescer
            .request(["camera"], |names| {
                for name in names {
                    store.publish(name, true);
                }
            })
            .unwrap();
        assert_eq!(request.outcome(), Some(true));
    }

    #[test]
    fn test_duplicate_names_are_coalesced() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        let mut prompted = Vec::new();
        let mut fut = task::spawn(
            coalescer
                .request(["camera", "camera"], |names| prompted = names.to_vec())
                .unwrap(),
        );
        assert_eq!(prompted, vec![CapabilityName::from("camera")]);

        store.publish(&"camera".into(), true);
        assert_ready_eq!(fut.poll(), true);
    }

    #[test]
    fn test_resolved_request_ignores_later_values() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        let stream = store.stream_for(&"camera".into());
        let mut fut = task::spawn(coalescer.request(["camera"], |_| {}).unwrap());

        store.publish(&"camera".into(), true);
        assert_eq!(stream.listener_count(), 0);
        store.publish(&"camera".into(), false);
        assert_ready_eq!(fut.poll(), true);
    }

    #[test]
    fn test_dropping_request_detaches_listeners() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        let stream = store.stream_for(&"camera".into());

        let request = coalescer.request(["camera"], |_| {}).unwrap();
        assert_eq!(stream.listener_count(), 1);
        drop(request);
        assert_eq!(stream.listener_count(), 0);
    }

    #[test]
    fn test_independent_requests_each_trigger() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        let calls = Cell::new(0);
        let bump = |_: &[CapabilityName]| calls.set(calls.get() + 1);
        let mut first = task::spawn(coalescer.request(["camera"], bump).unwrap());
        let mut second = task::spawn(coalescer.request(["camera"], bump).unwrap());
        assert_eq!(calls.get(), 2);

        store.publish(&"camera".into(), true);
        assert_ready_eq!(first.poll(), true);
        assert_ready_eq!(second.poll(), true);
    }

    #[test]
    fn test_listener_republishing_does_not_overtake_answer() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        let stream = store.stream_for(&"camera".into());
        let republisher = store.clone();
        stream.subscribe_fresh(move |_| {
            move |_, granted| {
                if granted {
                    republisher.publish(&"camera".into(), false);
                }
            }
        });

        let mut fut = task::spawn(coalescer.request(["camera"], |_| {}).unwrap());
        store.publish(&"camera".into(), true);
        assert_ready_eq!(fut.poll(), true);
        assert!(!stream.current());
    }

    #[tokio::test]
    async fn test_await_across_tasks() {
        let (store, coalescer) = coalescer(&HostStatusTable::new());
        let request = coalescer.request(["camera", "mic"], |_| {}).unwrap();

        let host = tokio::spawn(async move {
            tokio::task::yield_now().await;
            store.publish(&"mic".into(), true);
            store.publish(&"camera".into(), true);
        });

        assert!(request.await);
        host.await.unwrap();
    }
}
