//! Host environment bindings.
//!
//! The host shows permission prompts and later calls back with results.
//! [`ScreenHost`] and [`ComponentHost`] are the two ways a prompt can be
//! raised; both end in the same trigger contract. Results come back through
//! a [`ResultDispatcher`].

pub mod dispatch;

pub use dispatch::{DispatchChain, ResultDispatcher, ResultRouter};

use crate::types::{CapabilityName, RequestToken};

/// A full-screen host able to raise a permission prompt.
pub trait ScreenHost {
    /// Show the prompt for `names`. Results must come back tagged with `token`
    /// and listing the names in this order.
    fn request_permissions(&self, names: &[CapabilityName], token: RequestToken);
}

/// An embedded host component able to raise a permission prompt.
pub trait ComponentHost {
    /// Show the prompt for `names`. Results must come back tagged with `token`
    /// and listing the names in this order.
    fn request_permissions(&self, names: &[CapabilityName], token: RequestToken);
}
