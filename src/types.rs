//! Core identifier and code types shared by every module.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform level from which the run-time authorization model exists.
///
/// Hosts reporting a lower level grant every capability unconditionally.
pub const PLATFORM_LEVEL_RUNTIME_PERMISSIONS: u32 = 23;

/// The request token issued with every host prompt.
pub const REQUEST_TOKEN: RequestToken = RequestToken(8712);

/// Opaque identifier of a permission, e.g. `"android.permission.CAMERA"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityName(String);

impl CapabilityName {
    /// Create a capability name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CapabilityName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CapabilityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CapabilityName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CapabilityName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&CapabilityName> for CapabilityName {
    fn from(value: &CapabilityName) -> Self {
        value.clone()
    }
}

/// Correlation token passed to the host prompt and echoed back with results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(pub u32);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer result code reported by a host for one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantCode(pub i32);

impl GrantCode {
    /// The host granted the capability.
    pub const GRANTED: GrantCode = GrantCode(0);
    /// The host denied the capability.
    pub const DENIED: GrantCode = GrantCode(-1);

    /// Only [`GrantCode::GRANTED`] counts as granted; every other code is a denial.
    pub fn is_granted(self) -> bool {
        self == Self::GRANTED
    }
}

impl From<bool> for GrantCode {
    fn from(granted: bool) -> Self {
        if granted {
            Self::GRANTED
        } else {
            Self::DENIED
        }
    }
}
