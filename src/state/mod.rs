//! Per-capability state streams and the store that owns them.
//!
//! Every capability gets at most one [`StateStream`], created on first
//! access and seeded with the host-reported status. Delivered results are
//! pushed into the stream and fan out to its listeners in subscription order.

pub mod store;
pub mod stream;

pub use store::StateStore;
pub use stream::{Listener, ListenerId, StateSnapshot, StateStream, StateUpdates};
