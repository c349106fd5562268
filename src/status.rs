//! Host authorization status queries.
//!
//! The core only asks a [`StatusSource`] when it seeds a new state stream and
//! when a caller takes a synchronous snapshot. It never consults it to answer
//! a delivered result.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::CapabilityName;

/// Synchronous, side-effect-free query of host-reported authorization.
pub trait StatusSource: Send + Sync {
    /// Whether the host currently reports `name` as granted.
    fn current_status(&self, name: &CapabilityName) -> bool;
}

impl<F> StatusSource for F
where
    F: Fn(&CapabilityName) -> bool + Send + Sync,
{
    fn current_status(&self, name: &CapabilityName) -> bool {
        self(name)
    }
}

/// Reports every capability as granted on hosts below `threshold`.
///
/// Legacy platforms have no run-time authorization model; everything the
/// application declares is granted up front.
#[derive(Debug, Clone)]
pub struct VersionGated<S> {
    inner: S,
    platform_level: u32,
    threshold: u32,
}

impl<S: StatusSource> VersionGated<S> {
    pub fn new(inner: S, platform_level: u32, threshold: u32) -> Self {
        Self {
            inner,
            platform_level,
            threshold,
        }
    }

    /// Whether the wrapped source is consulted at all.
    pub fn applies(&self) -> bool {
        self.platform_level >= self.threshold
    }
}

impl<S: StatusSource> StatusSource for VersionGated<S> {
    fn current_status(&self, name: &CapabilityName) -> bool {
        !self.applies() || self.inner.current_status(name)
    }
}

/// In-memory host authorization table. Unknown capabilities are denied.
///
/// Cloning shares the table, so a host simulator and the core can hold the
/// same instance.
#[derive(Debug, Clone, Default)]
pub struct HostStatusTable {
    granted: Arc<RwLock<HashMap<CapabilityName, bool>>>,
}

impl HostStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the host status of `name`.
    pub fn set(&self, name: impl Into<CapabilityName>, granted: bool) {
        self.granted.write().insert(name.into(), granted);
    }

    pub fn grant(&self, name: impl Into<CapabilityName>) {
        self.set(name, true);
    }

    pub fn revoke(&self, name: impl Into<CapabilityName>) {
        self.set(name, false);
    }
}

impl StatusSource for HostStatusTable {
    fn current_status(&self, name: &CapabilityName) -> bool {
        self.granted.read().get(name).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_defaults_to_denied() {
        let table = HostStatusTable::new();
        assert!(!table.current_status(&"camera".into()));

        table.grant("camera");
        assert!(table.current_status(&"camera".into()));

        table.revoke("camera");
        assert!(!table.current_status(&"camera".into()));
    }

    #[test]
    fn test_table_clones_share_state() {
        let table = HostStatusTable::new();
        let host_side = table.clone();
        host_side.grant("location");
        assert!(table.current_status(&"location".into()));
    }

    #[test]
    fn test_version_gate_below_threshold_grants_everything() {
        let gated = VersionGated::new(HostStatusTable::new(), 22, 23);
        assert!(!gated.applies());
        assert!(gated.current_status(&"camera".into()));
    }

    #[test]
    fn test_version_gate_at_threshold_delegates() {
        let gated = VersionGated::new(HostStatusTable::new(), 23, 23);
        assert!(gated.applies());
        assert!(!gated.current_status(&"camera".into()));
    }

    #[test]
    fn test_closure_source() {
        let source = |name: &CapabilityName| name.as_str() == "mic";
        assert!(source.current_status(&"mic".into()));
        assert!(!source.current_status(&"camera".into()));
    }
}
