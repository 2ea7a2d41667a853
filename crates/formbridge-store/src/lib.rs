//! FormBridge Store: two-scope settings persistence and the activity log.
//!
//! Settings are kept per integration (global scope) and per
//! `(form, integration)` pair (entity scope). Every write is sanitized
//! centrally before it reaches SQLite.

pub mod sanitize;
pub mod schema;
pub mod settings;
pub mod sqlite;
pub mod types;

pub use sanitize::{sanitize_settings, sanitize_value};
pub use settings::{SettingsStore, WriteOutcome};
pub use sqlite::SqliteStore;
pub use types::*;
