//! Backend configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Default time SQLite waits on a locked database before giving up.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Database file (from FEATURE_STATE_DB_PATH). `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    /// SQLite busy timeout (from FEATURE_STATE_BUSY_TIMEOUT_MS)
    pub busy_timeout: Duration,
}

impl BackendConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database_path = std::env::var_os("FEATURE_STATE_DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let busy_timeout = std::env::var("FEATURE_STATE_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);

        Self {
            database_path,
            busy_timeout: Duration::from_millis(busy_timeout),
        }
    }

    /// Configuration pointing at an explicit database file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH_VAR: &str = "FEATURE_STATE_DB_PATH";
    const TIMEOUT_VAR: &str = "FEATURE_STATE_BUSY_TIMEOUT_MS";

    /// Run `f` with the given env values, restoring the previous ones afterwards.
    fn with_env(path: Option<&str>, timeout: Option<&str>, f: impl FnOnce()) {
        let saved_path = std::env::var_os(PATH_VAR);
        let saved_timeout = std::env::var_os(TIMEOUT_VAR);

        set_or_remove(PATH_VAR, path);
        set_or_remove(TIMEOUT_VAR, timeout);
        f();

        set_or_remove(PATH_VAR, saved_path.as_deref());
        set_or_remove(TIMEOUT_VAR, saved_timeout.as_deref());
    }

    fn set_or_remove<V: AsRef<std::ffi::OsStr> + ?Sized>(var: &str, value: Option<&V>) {
        match value {
            Some(value) => std::env::set_var(var, value),
            None => std::env::remove_var(var),
        }
    }

    // One test so the env mutations never race with each other.
    #[test]
    fn from_env_reads_and_defaults() {
        with_env(Some("/tmp/flags/features.db"), Some("250"), || {
            let config = BackendConfig::from_env();
            assert_eq!(
                config.database_path,
                Some(PathBuf::from("/tmp/flags/features.db"))
            );
            assert_eq!(config.busy_timeout, Duration::from_millis(250));
        });

        with_env(Some(""), None, || {
            let config = BackendConfig::from_env();
            assert!(config.database_path.is_none());
            assert_eq!(
                config.busy_timeout,
                Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS)
            );
        });

        with_env(None, Some("soon"), || {
            let config = BackendConfig::from_env();
            assert!(config.database_path.is_none());
            assert_eq!(config.busy_timeout, Duration::from_millis(5_000));
        });
    }

    #[test]
    fn with_path_keeps_default_timeout() {
        let config = BackendConfig::with_path("/var/lib/features.db");
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/features.db"))
        );
        assert_eq!(config.busy_timeout, BackendConfig::default().busy_timeout);
    }
}
