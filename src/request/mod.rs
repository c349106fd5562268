//! Request coalescing.
//!
//! A request attaches one fresh-value listener per capability, prompts the
//! host once, and resolves with the AND of the answers. Values already in a
//! stream when the request starts never count as an answer.

mod barrier;
pub mod coalescer;
pub mod grant;

pub use coalescer::{PermissionRequest, RequestCoalescer};
pub use grant::GrantWatch;
