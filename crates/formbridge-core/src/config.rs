//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default outbound HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Default activity log retention.
pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 30;

/// Paths to FormBridge data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            root,
        };
        std::fs::create_dir_all(&paths.db)?;
        Ok(paths)
    }
}

/// Top-level FormBridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormBridgeConfig {
    pub data_paths: DataPaths,
    /// Timeout applied to every outbound API call unless overridden per request.
    pub http_timeout_secs: u64,
    /// Fallback retention when the `log_retention_days` option is unset.
    pub log_retention_days: u32,
    /// Upper bound for a single adapter during dispatch. `None` waits for the
    /// HTTP timeout only.
    pub dispatch_timeout_secs: Option<u64>,
}

impl FormBridgeConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let http_timeout_secs = env_parse("FORMBRIDGE_HTTP_TIMEOUT_SECS")
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        let log_retention_days = env_parse("FORMBRIDGE_LOG_RETENTION_DAYS")
            .unwrap_or(DEFAULT_LOG_RETENTION_DAYS);
        let dispatch_timeout_secs = env_parse("FORMBRIDGE_DISPATCH_TIMEOUT_SECS");

        Ok(Self {
            data_paths: DataPaths::new(data_dir)?,
            http_timeout_secs,
            log_retention_days,
            dispatch_timeout_secs,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}
