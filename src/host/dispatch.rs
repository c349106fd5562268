//! Routing of host permission results into the state store.

use std::fmt;
use std::sync::Arc;

use crate::state::StateStore;
use crate::types::{CapabilityName, GrantCode, RequestToken};

/// Something that may handle a host permission-result callback.
///
/// Returning `false` means "not mine", letting a [`DispatchChain`] try the
/// next dispatcher.
pub trait ResultDispatcher: Send + Sync {
    fn dispatch(&self, token: RequestToken, names: &[CapabilityName], codes: &[GrantCode]) -> bool;
}

/// Publishes results carrying the expected token into a store.
#[derive(Clone)]
pub struct ResultRouter {
    token: RequestToken,
    store: Arc<StateStore>,
}

impl ResultRouter {
    pub fn new(token: RequestToken, store: Arc<StateStore>) -> Self {
        Self { token, store }
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Publish `results[i]` for `names[i]`, in order.
    ///
    /// Returns `false` without touching any stream if `token` is not ours.
    ///
    /// # Panics
    ///
    /// Panics if `names` and `results` differ in length.
    pub fn deliver_result(
        &self,
        token: RequestToken,
        names: &[CapabilityName],
        results: &[bool],
    ) -> bool {
        if token != self.token {
            log::debug!("Ignoring permission result for foreign token {}", token);
            return false;
        }
        assert_eq!(
            names.len(),
            results.len(),
            "permission result lists differ in length"
        );
        for (name, granted) in names.iter().zip(results) {
            log::debug!("Host answered {} = {}", name, granted);
            self.store.publish(name, *granted);
        }
        true
    }

    /// Like [`deliver_result`](Self::deliver_result) with host result codes.
    ///
    /// # Panics
    ///
    /// Panics if `names` and `codes` differ in length.
    pub fn deliver_codes(
        &self,
        token: RequestToken,
        names: &[CapabilityName],
        codes: &[GrantCode],
    ) -> bool {
        let results: Vec<bool> = codes.iter().map(|code| code.is_granted()).collect();
        self.deliver_result(token, names, &results)
    }
}

impl ResultDispatcher for ResultRouter {
    fn dispatch(&self, token: RequestToken, names: &[CapabilityName], codes: &[GrantCode]) -> bool {
        self.deliver_codes(token, names, codes)
    }
}

impl fmt::Debug for ResultRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultRouter")
            .field("token", &self.token)
            .finish()
    }
}

/// Ordered list of dispatchers; the first one that handles a result wins.
#[derive(Default)]
pub struct DispatchChain {
    dispatchers: Vec<Arc<dyn ResultDispatcher>>,
}

impl DispatchChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dispatcher: Arc<dyn ResultDispatcher>) {
        self.dispatchers.push(dispatcher);
    }

    pub fn with(mut self, dispatcher: Arc<dyn ResultDispatcher>) -> Self {
        self.push(dispatcher);
        self
    }

    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}

impl ResultDispatcher for DispatchChain {
    fn dispatch(&self, token: RequestToken, names: &[CapabilityName], codes: &[GrantCode]) -> bool {
        self.dispatchers
            .iter()
            .any(|dispatcher| dispatcher.dispatch(token, names, codes))
    }
}
