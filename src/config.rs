//! Configuration for the permission core.
//!
//! Values come from defaults, an optional YAML file, and environment
//! overrides, applied in that order.
//!
//! # Environment Variables
//!
//! - `PERMISSIONS_REQUEST_TOKEN` — token issued with host prompts (default: 8712)
//! - `PERMISSIONS_PLATFORM_LEVEL` — platform level reported by the host
//! - `PERMISSIONS_LOG_LEVEL` — log filter used by [`crate::logging::init_logging`]

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PermissionError, Result};
use crate::types::{RequestToken, PLATFORM_LEVEL_RUNTIME_PERMISSIONS, REQUEST_TOKEN};

pub const ENV_REQUEST_TOKEN: &str = "PERMISSIONS_REQUEST_TOKEN";
pub const ENV_PLATFORM_LEVEL: &str = "PERMISSIONS_PLATFORM_LEVEL";
pub const ENV_LOG_LEVEL: &str = "PERMISSIONS_LOG_LEVEL";

/// Settings for [`crate::Permissions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Token passed to host prompts; deliveries carrying another token are ignored.
    pub request_token: u32,

    /// Platform level the host runs at.
    pub platform_level: u32,

    /// Level from which the run-time authorization model applies.
    pub runtime_permission_threshold: u32,

    /// Pre-sized capacity of the state store.
    pub initial_capacity: usize,

    /// Log filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            request_token: REQUEST_TOKEN.0,
            platform_level: u32::MAX,
            runtime_permission_threshold: PLATFORM_LEVEL_RUNTIME_PERMISSIONS,
            initial_capacity: 6,
            log_level: "info".to_string(),
        }
    }
}

impl PermissionsConfig {
    /// Parse a configuration from YAML. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_REQUEST_TOKEN) {
            match raw.trim().parse::<u32>() {
                Ok(token) => self.request_token = token,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_REQUEST_TOKEN, raw, e),
            }
        }
        if let Some(raw) = lookup(ENV_PLATFORM_LEVEL) {
            match raw.trim().parse::<u32>() {
                Ok(level) => self.platform_level = level,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_PLATFORM_LEVEL, raw, e),
            }
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
    }

    /// The token as a typed value.
    pub fn token(&self) -> RequestToken {
        RequestToken(self.request_token)
    }

    /// Whether the host runs the run-time authorization model at all.
    pub fn uses_runtime_model(&self) -> bool {
        self.platform_level >= self.runtime_permission_threshold
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            return Err(PermissionError::Config {
                message: "log_level must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PermissionsConfig::default();
        assert_eq!(config.token(), REQUEST_TOKEN);
        assert_eq!(config.initial_capacity, 6);
        assert!(config.uses_runtime_model());
    }

    #[test]
    fn test_yaml_partial_keeps_defaults() {
        let config = PermissionsConfig::from_yaml_str("platform_level: 21\n").unwrap();
        assert_eq!(config.platform_level, 21);
        assert_eq!(config.request_token, 8712);
        assert!(!config.uses_runtime_model());
    }

    #[test]
    fn test_yaml_rejects_empty_log_level() {
        let err = PermissionsConfig::from_yaml_str("log_level: \"\"\n").unwrap_err();
        assert!(matches!(err, PermissionError::Config { .. }));
    }

    #[test]
    fn test_yaml_rejects_garbage() {
        let err = PermissionsConfig::from_yaml_str("request_token: [1, 2]\n").unwrap_err();
        assert!(matches!(err, PermissionError::Yaml(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_token: 42\nlog_level: debug").unwrap();

        let config = PermissionsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.token(), RequestToken(42));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PermissionsConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, PermissionError::Io(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_REQUEST_TOKEN, "99"),
            (ENV_PLATFORM_LEVEL, "not-a-number"),
            (ENV_LOG_LEVEL, "trace"),
        ]);
        let mut config = PermissionsConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.request_token, 99);
        assert_eq!(config.platform_level, u32::MAX);
        assert_eq!(config.log_level, "trace");
    }
}
