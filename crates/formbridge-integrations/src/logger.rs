//! Durable record of what adapters did.
//!
//! Rows go to the `integration_logs` table and are mirrored to `tracing`.
//! The `enable_logging` option is read on every call so it can be toggled
//! while running.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use formbridge_core::value::{as_lenient_string, is_truthy};
use formbridge_core::Result;
use formbridge_store::{
    LogEntry, LogFilter, LogLevel, LogStats, NewLogEntry, SettingsStore, SqliteStore,
};

/// Option name of the global logging switch.
pub const ENABLE_LOGGING_OPTION: &str = "enable_logging";
/// Option name of the retention window in days.
pub const LOG_RETENTION_OPTION: &str = "log_retention_days";

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Optional context attached to a log row.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub form_id: Option<i64>,
    pub submission_id: Option<i64>,
    pub data: Option<Value>,
}

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(mut self, form_id: i64) -> Self {
        self.form_id = Some(form_id);
        self
    }

    pub fn submission(mut self, submission_id: i64) -> Self {
        self.submission_id = Some(submission_id);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Clone)]
pub struct ActivityLogger {
    store: Arc<SqliteStore>,
    default_retention_days: u32,
}

impl ActivityLogger {
    pub fn new(store: Arc<SqliteStore>, default_retention_days: u32) -> Self {
        Self {
            store,
            default_retention_days,
        }
    }

    fn logging_enabled(&self) -> bool {
        match self.store.get_option(ENABLE_LOGGING_OPTION) {
            Ok(Some(value)) => is_truthy(&value),
            Ok(None) => true,
            Err(e) => {
                warn!("Could not read {} option: {}", ENABLE_LOGGING_OPTION, e);
                true
            }
        }
    }

    /// Record one event. Returns the row ID when something was persisted.
    pub fn log(
        &self,
        integration_id: &str,
        level: LogLevel,
        message: impl Into<String>,
        context: LogContext,
    ) -> Option<i64> {
        let message = message.into();

        if !self.logging_enabled() {
            debug!("[{}] {} (activity log disabled): {}", integration_id, level, message);
            return None;
        }

        match level {
            LogLevel::Info | LogLevel::Success => info!("[{}] {}: {}", integration_id, level, message),
            LogLevel::Warning => warn!("[{}] {}", integration_id, message),
            LogLevel::Error => error!("[{}] {}", integration_id, message),
        }

        let entry = NewLogEntry {
            integration_id: integration_id.to_string(),
            form_id: context.form_id,
            submission_id: context.submission_id,
            status: level,
            message,
            data: context.data,
            created_at: None,
        };
        match self.store.insert_log(&entry) {
            Ok(id) => Some(id),
            Err(e) => {
                error!("Failed to write activity log for {}: {}", integration_id, e);
                None
            }
        }
    }

    pub fn info(&self, integration_id: &str, message: impl Into<String>, context: LogContext) -> Option<i64> {
        self.log(integration_id, LogLevel::Info, message, context)
    }

    pub fn success(&self, integration_id: &str, message: impl Into<String>, context: LogContext) -> Option<i64> {
        self.log(integration_id, LogLevel::Success, message, context)
    }

    pub fn warning(&self, integration_id: &str, message: impl Into<String>, context: LogContext) -> Option<i64> {
        self.log(integration_id, LogLevel::Warning, message, context)
    }

    pub fn error(&self, integration_id: &str, message: impl Into<String>, context: LogContext) -> Option<i64> {
        self.log(integration_id, LogLevel::Error, message, context)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Matching entries, newest first.
    pub fn get_logs(&self, filter: &LogFilter, limit: usize, offset: usize) -> Result<Vec<LogEntry>> {
        self.store.query_logs(filter, limit, offset)
    }

    /// Counts by status for one integration over the last `days` days.
    pub fn get_stats(&self, integration_id: &str, days: u32) -> Result<LogStats> {
        let filter = LogFilter {
            integration_id: Some(integration_id.to_string()),
            since: Some(now_millis() - i64::from(days) * DAY_MILLIS),
            ..Default::default()
        };
        self.store.log_stats(&filter)
    }

    // ---------------------------------------------------------------
    // Retention
    // ---------------------------------------------------------------

    /// Retention window: the `log_retention_days` option when set to a
    /// positive number, else the configured default.
    pub fn retention_days(&self) -> u32 {
        let option = match self.store.get_option(LOG_RETENTION_OPTION) {
            Ok(v) => v,
            Err(e) => {
                warn!("Could not read {} option: {}", LOG_RETENTION_OPTION, e);
                None
            }
        };
        option
            .as_ref()
            .and_then(as_lenient_string)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|days| *days > 0)
            .unwrap_or(self.default_retention_days)
    }

    /// Delete entries older than the retention window.
    pub fn clear_old_logs(&self) -> Result<usize> {
        let days = self.retention_days();
        let cutoff = now_millis() - i64::from(days) * DAY_MILLIS;
        let deleted = self.store.delete_logs_before(cutoff)?;
        info!("Pruned {} activity log entries older than {} days", deleted, days);
        Ok(deleted)
    }

    /// Delete every entry of one integration.
    pub fn delete_logs(&self, integration_id: &str) -> Result<usize> {
        let deleted = self.store.delete_logs_for(integration_id)?;
        info!("Deleted {} activity log entries for {}", deleted, integration_id);
        Ok(deleted)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
