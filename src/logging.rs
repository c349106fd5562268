//! Logger initialisation for embedders that do not install their own.
//!
//! The crate itself only emits through the `log` facade.

/// Install an `env_logger` backend.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this more than
/// once is harmless; returns `false` if a logger was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_logging("debug");
        assert!(!init_logging("debug"));
    }
}
