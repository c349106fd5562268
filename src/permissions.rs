//! The public facade embedding applications talk to.
//!
//! Build one [`Permissions`] in the composition root and hand out references
//! (or the `Arc`) to every consumer. All operations are meant to be called
//! from the host's main thread; the internals are nonetheless lock-guarded.

use std::sync::Arc;

use crate::config::PermissionsConfig;
use crate::error::Result;
use crate::host::{ComponentHost, ResultDispatcher, ResultRouter, ScreenHost};
use crate::request::{GrantWatch, PermissionRequest, RequestCoalescer};
use crate::state::{StateSnapshot, StateStore, StateStream};
use crate::status::{StatusSource, VersionGated};
use crate::types::{CapabilityName, GrantCode, RequestToken};

/// Observe run-time permissions and request them from the host.
#[derive(Debug, Clone)]
pub struct Permissions {
    store: Arc<StateStore>,
    coalescer: RequestCoalescer,
    router: ResultRouter,
}

impl Permissions {
    /// Build with default configuration around a host status source.
    pub fn new(status: impl StatusSource + 'static) -> Self {
        Self::with_config(&PermissionsConfig::default(), status)
    }

    /// Build from configuration, using `status` as-is.
    pub fn with_config(config: &PermissionsConfig, status: impl StatusSource + 'static) -> Self {
        let store = Arc::new(StateStore::with_capacity(
            Arc::new(status),
            config.initial_capacity,
        ));
        Self {
            coalescer: RequestCoalescer::new(store.clone()),
            router: ResultRouter::new(config.token(), store.clone()),
            store,
        }
    }

    /// Build from configuration, granting everything on hosts below the
    /// configured run-time permission threshold.
    pub fn from_config(config: &PermissionsConfig, status: impl StatusSource + 'static) -> Self {
        let gated = VersionGated::new(
            status,
            config.platform_level,
            config.runtime_permission_threshold,
        );
        Self::with_config(config, gated)
    }

    /// Stream of state changes for `name`, starting with its current value.
    pub fn observe(&self, name: impl Into<CapabilityName>) -> StateStream {
        self.store.stream_for(&name.into())
    }

    /// Completes the first time `name` is granted.
    pub fn once_granted(&self, name: impl Into<CapabilityName>) -> GrantWatch {
        GrantWatch::new(self.observe(name))
    }

    /// Request `names`, running `trigger` to prompt the host unless all are
    /// already granted.
    pub fn request<I, N, T>(&self, names: I, trigger: T) -> Result<PermissionRequest>
    where
        I: IntoIterator<Item = N>,
        N: Into<CapabilityName>,
        T: FnOnce(&[CapabilityName], RequestToken),
    {
        let token = self.router.token();
        self.coalescer.request(names, |names| trigger(names, token))
    }

    /// Request `names` through a full-screen host.
    pub fn request_with_screen<I, N>(
        &self,
        names: I,
        screen: &dyn ScreenHost,
    ) -> Result<PermissionRequest>
    where
        I: IntoIterator<Item = N>,
        N: Into<CapabilityName>,
    {
        self.request(names, |names, token| screen.request_permissions(names, token))
    }

    /// Request `names` through an embedded host component.
    pub fn request_with_component<I, N>(
        &self,
        names: I,
        component: &dyn ComponentHost,
    ) -> Result<PermissionRequest>
    where
        I: IntoIterator<Item = N>,
        N: Into<CapabilityName>,
    {
        self.request(names, |names, token| component.request_permissions(names, token))
    }

    /// Host snapshot for one capability. Does not create a stream.
    pub fn has_permission(&self, name: impl Into<CapabilityName>) -> bool {
        self.store.current_status(&name.into())
    }

    /// Whether the host reports every one of `names` as granted.
    pub fn has_permissions<I, N>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = N>,
        N: Into<CapabilityName>,
    {
        names.into_iter().all(|name| self.has_permission(name))
    }

    /// Host result callback. Returns `false` for a foreign token.
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
        self.router.deliver_result(token, names, results)
    }

    /// Host result callback with integer result codes.
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
        self.router.deliver_codes(token, names, codes)
    }

    /// The token every host prompt is tagged with.
    pub fn token(&self) -> RequestToken {
        self.router.token()
    }

    pub fn snapshots(&self) -> Vec<StateSnapshot> {
        self.store.snapshots()
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }
}

impl ResultDispatcher for Permissions {
    fn dispatch(&self, token: RequestToken, names: &[CapabilityName], codes: &[GrantCode]) -> bool {
        self.deliver_codes(token, names, codes)
    }
}
