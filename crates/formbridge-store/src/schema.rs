//! Database schema SQL.

/// Settings tables: global (per integration), per form, installation options.
pub const SETTINGS_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS global_settings (
    integration_id TEXT PRIMARY KEY,
    settings_json TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS form_settings (
    form_id INTEGER NOT NULL,
    integration_id TEXT NOT NULL,
    settings_json TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (form_id, integration_id)
);

CREATE TABLE IF NOT EXISTS options (
    name TEXT PRIMARY KEY,
    value_json TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// Append-only activity log.
pub const LOG_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS integration_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_id INTEGER,
    submission_id INTEGER,
    integration_id TEXT NOT NULL,
    status TEXT NOT NULL,
    message TEXT NOT NULL,
    data_json TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_logs_integration ON integration_logs(integration_id);
CREATE INDEX IF NOT EXISTS idx_logs_status ON integration_logs(status);
CREATE INDEX IF NOT EXISTS idx_logs_created ON integration_logs(created_at);
"#;
