//! # permission-streams
//!
//! Run-time permission state as observable, replayable streams, with
//! coalesced host permission requests.
//!
//! Each capability name maps to one hot [`StateStream`], seeded with the
//! host-reported status on first access. A [`PermissionRequest`] attaches to
//! the streams it cares about, prompts the host once, and resolves with the
//! AND of the next answer each stream receives. The host reports answers
//! through [`Permissions::deliver_result`].
//!
//! ```ignore
//! let permissions = Permissions::new(host_status);
//! let granted = permissions.request_with_screen(["camera"], &screen)?.await;
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod permissions;
pub mod request;
pub mod state;
pub mod status;
pub mod types;

pub use config::PermissionsConfig;
pub use error::PermissionError;
pub use host::{ComponentHost, DispatchChain, ResultDispatcher, ResultRouter, ScreenHost};
pub use permissions::Permissions;
pub use request::{GrantWatch, PermissionRequest, RequestCoalescer};
pub use state::{StateSnapshot, StateStore, StateStream, StateUpdates};
pub use status::{HostStatusTable, StatusSource, VersionGated};
pub use types::{CapabilityName, GrantCode, RequestToken, REQUEST_TOKEN};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
