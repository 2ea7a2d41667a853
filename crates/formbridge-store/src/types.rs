//! Activity log record types.

use serde::{Deserialize, Serialize};

/// Status of a logged integration event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// A persisted log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub integration_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<i64>,
    pub status: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Unix milliseconds.
    pub created_at: i64,
}

/// A log row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub integration_id: String,
    pub form_id: Option<i64>,
    pub submission_id: Option<i64>,
    pub status: LogLevel,
    pub message: String,
    pub data: Option<serde_json::Value>,
    /// Defaults to now.
    pub created_at: Option<i64>,
}

/// Query filter for log listings. Unset fields do not constrain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    pub integration_id: Option<String>,
    pub form_id: Option<i64>,
    pub submission_id: Option<i64>,
    pub status: Option<LogLevel>,
    /// Inclusive lower bound, unix milliseconds.
    pub since: Option<i64>,
    /// Exclusive upper bound, unix milliseconds.
    pub until: Option<i64>,
}

impl LogFilter {
    pub fn for_integration(integration_id: impl Into<String>) -> Self {
        Self {
            integration_id: Some(integration_id.into()),
            ..Default::default()
        }
    }
}

/// Log counts grouped by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    pub total: i64,
    pub info: i64,
    pub success: i64,
    pub warning: i64,
    pub error: i64,
}

impl LogStats {
    pub(crate) fn add(&mut self, level: LogLevel, count: i64) {
        match level {
            LogLevel::Info => self.info += count,
            LogLevel::Success => self.success += count,
            LogLevel::Warning => self.warning += count,
            LogLevel::Error => self.error += count,
        }
        self.total += count;
    }

    pub fn count(&self, level: LogLevel) -> i64 {
        match level {
            LogLevel::Info => self.info,
            LogLevel::Success => self.success,
            LogLevel::Warning => self.warning,
            LogLevel::Error => self.error,
        }
    }
}
