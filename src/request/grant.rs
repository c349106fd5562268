//! Future that completes the first time a capability is granted.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::state::{ListenerId, StateStream};

struct Latch {
    done: bool,
    waker: Option<Waker>,
    subscription: Option<(StateStream, ListenerId)>,
}

/// Resolves once `stream` reports `true`, counting its current value.
///
/// Never resolves if the capability is never granted. Dropping it detaches
/// its listener.
#[must_use = "futures do nothing unless polled"]
pub struct GrantWatch {
    latch: Arc<Mutex<Latch>>,
}

impl GrantWatch {
    pub(crate) fn new(stream: StateStream) -> Self {
        let latch = Arc::new(Mutex::new(Latch {
            done: false,
            waker: None,
            subscription: None,
        }));
        let weak: Weak<Mutex<Latch>> = Arc::downgrade(&latch);
        let id = stream.subscribe(move |_, granted| {
            if !granted {
                return;
            }
            let Some(latch) = weak.upgrade() else {
                return;
            };
            let (waker, subscription) = {
                let mut latch = latch.lock();
                if latch.done {
                    return;
                }
                latch.done = true;
                (latch.waker.take(), latch.subscription.take())
            };
            if let Some((stream, id)) = subscription {
                stream.unsubscribe(id);
            }
            if let Some(waker) = waker {
                waker.wake();
            }
        });

        // The replay above may already have completed the latch.
        let mut state = latch.lock();
        if state.done {
            drop(state);
            stream.unsubscribe(id);
        } else {
            state.subscription = Some((stream, id));
            drop(state);
        }
        Self { latch }
    }

    pub fn is_granted(&self) -> bool {
        self.latch.lock().done
    }
}

impl Future for GrantWatch {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut latch = self.latch.lock();
        if latch.done {
            return Poll::Ready(());
        }
        latch.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for GrantWatch {
    fn drop(&mut self) {
        let subscription = self.latch.lock().subscription.take();
        if let Some((stream, id)) = subscription {
            stream.unsubscribe(id);
        }
    }
}

impl std::fmt::Debug for GrantWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantWatch")
            .field("granted", &self.is_granted())
            .finish()
    }
}
