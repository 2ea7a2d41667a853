//! SQLite implementation of the settings store and the activity log tables.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use crate::sanitize::{sanitize_settings, sanitize_value};
use crate::schema::{LOG_SCHEMA_SQL, SETTINGS_SCHEMA_SQL};
use crate::settings::{SettingsStore, WriteOutcome};
use crate::types::*;
use formbridge_core::{Error, Result, SettingsMap};

/// Settings + activity log store backed by a single SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

impl SqliteStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/formbridge.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("formbridge.db");

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        info!("SqliteStore initialized: path={}", store.db_path.display());
        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(db_err)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(db_err)?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        let full_schema = format!("{}\n{}", SETTINGS_SCHEMA_SQL, LOG_SCHEMA_SQL);
        conn.execute_batch(&full_schema)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn parse_settings(json: Option<String>) -> SettingsMap {
        json.as_deref()
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------
    // Activity Log
    // ---------------------------------------------------------------

    /// Append a log row. Returns the new row ID.
    pub fn insert_log(&self, entry: &NewLogEntry) -> Result<i64> {
        let created_at = entry.created_at.unwrap_or_else(now_millis);
        let data_json = entry
            .data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO integration_logs
                 (form_id, submission_id, integration_id, status, message, data_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(db_err)?
            .insert(params![
                entry.form_id,
                entry.submission_id,
                entry.integration_id,
                entry.status.as_str(),
                entry.message,
                data_json,
                created_at
            ])
            .map_err(db_err)?;
        Ok(id)
    }

    fn filter_clause(filter: &LogFilter) -> (String, Vec<SqlValue>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(id) = &filter.integration_id {
            clauses.push("integration_id = ?");
            values.push(SqlValue::Text(id.clone()));
        }
        if let Some(form_id) = filter.form_id {
            clauses.push("form_id = ?");
            values.push(SqlValue::Integer(form_id));
        }
        if let Some(submission_id) = filter.submission_id {
            clauses.push("submission_id = ?");
            values.push(SqlValue::Integer(submission_id));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(SqlValue::Text(status.as_str().to_string()));
        }
        if let Some(since) = filter.since {
            clauses.push("created_at >= ?");
            values.push(SqlValue::Integer(since));
        }
        if let Some(until) = filter.until {
            clauses.push("created_at < ?");
            values.push(SqlValue::Integer(until));
        }

        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        (sql, values)
    }

    /// Log rows matching `filter`, newest first.
    pub fn query_logs(&self, filter: &LogFilter, limit: usize, offset: usize) -> Result<Vec<LogEntry>> {
        let (where_sql, mut values) = Self::filter_clause(filter);
        let sql = format!(
            "SELECT * FROM integration_logs{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            where_sql
        );
        values.push(SqlValue::Integer(limit as i64));
        values.push(SqlValue::Integer(offset as i64));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| Ok(Self::row_to_log(row)))
            .map_err(db_err)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Number of log rows matching `filter`.
    pub fn count_logs(&self, filter: &LogFilter) -> Result<i64> {
        let (where_sql, values) = Self::filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM integration_logs{}", where_sql);
        let conn = self.conn.lock();
        conn.query_row(&sql, params_from_iter(values), |row| row.get(0))
            .map_err(db_err)
    }

    /// Counts grouped by status for rows matching `filter`.
    pub fn log_stats(&self, filter: &LogFilter) -> Result<LogStats> {
        let (where_sql, values) = Self::filter_clause(filter);
        let sql = format!(
            "SELECT status, COUNT(*) FROM integration_logs{} GROUP BY status",
            where_sql
        );
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(db_err)?;

        let mut stats = LogStats::default();
        for (status, count) in rows.filter_map(|r| r.ok()) {
            if let Ok(level) = status.parse::<LogLevel>() {
                stats.add(level, count);
            }
        }
        Ok(stats)
    }

    /// Delete rows created before `cutoff` (unix milliseconds).
    pub fn delete_logs_before(&self, cutoff: i64) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM integration_logs WHERE created_at < ?1",
            params![cutoff],
        )
        .map_err(db_err)
    }

    /// Delete every row of one integration.
    pub fn delete_logs_for(&self, integration_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM integration_logs WHERE integration_id = ?1",
            params![integration_id],
        )
        .map_err(db_err)
    }

    // ---------------------------------------------------------------
    // Row Mapping Helpers
    // ---------------------------------------------------------------

    fn row_to_log(row: &rusqlite::Row<'_>) -> LogEntry {
        LogEntry {
            id: row.get("id").unwrap_or(0),
            integration_id: row.get("integration_id").unwrap_or_default(),
            form_id: row.get("form_id").ok().flatten(),
            submission_id: row.get("submission_id").ok().flatten(),
            status: row
                .get::<_, String>("status")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(LogLevel::Info),
            message: row.get("message").unwrap_or_default(),
            data: row
                .get::<_, Option<String>>("data_json")
                .ok()
                .flatten()
                .and_then(|s| serde_json::from_str(&s).ok()),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }
}

impl SettingsStore for SqliteStore {
    fn get_global(&self, integration_id: &str) -> Result<SettingsMap> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .prepare_cached("SELECT settings_json FROM global_settings WHERE integration_id = ?1")
            .map_err(db_err)?
            .query_row(params![integration_id], |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        Ok(Self::parse_settings(json))
    }

    fn set_global(&self, integration_id: &str, settings: &SettingsMap) -> Result<WriteOutcome> {
        let json = serde_json::to_string(&sanitize_settings(settings))?;

        let conn = self.conn.lock();
        let existing: Option<String> = conn
            .prepare_cached("SELECT settings_json FROM global_settings WHERE integration_id = ?1")
            .map_err(db_err)?
            .query_row(params![integration_id], |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        if existing.as_deref() == Some(json.as_str()) {
            debug!("Global settings for {} unchanged", integration_id);
            return Ok(WriteOutcome::Unchanged);
        }

        conn.execute(
            "INSERT INTO global_settings (integration_id, settings_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(integration_id) DO UPDATE SET
                settings_json = excluded.settings_json,
                updated_at = excluded.updated_at",
            params![integration_id, json, now_millis()],
        )
        .map_err(db_err)?;
        Ok(WriteOutcome::Written)
    }

    fn get_for_entity(&self, entity_id: i64, integration_id: &str) -> Result<SettingsMap> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .prepare_cached(
                "SELECT settings_json FROM form_settings WHERE form_id = ?1 AND integration_id = ?2",
            )
            .map_err(db_err)?
            .query_row(params![entity_id, integration_id], |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        Ok(Self::parse_settings(json))
    }

    fn set_for_entity(
        &self,
        entity_id: i64,
        integration_id: &str,
        settings: &SettingsMap,
    ) -> Result<WriteOutcome> {
        let json = serde_json::to_string(&sanitize_settings(settings))?;

        let conn = self.conn.lock();
        let existing: Option<String> = conn
            .prepare_cached(
                "SELECT settings_json FROM form_settings WHERE form_id = ?1 AND integration_id = ?2",
            )
            .map_err(db_err)?
            .query_row(params![entity_id, integration_id], |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        if existing.as_deref() == Some(json.as_str()) {
            return Ok(WriteOutcome::Unchanged);
        }

        let now = now_millis();
        conn.execute(
            "INSERT INTO form_settings (form_id, integration_id, settings_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(form_id, integration_id) DO UPDATE SET
                settings_json = excluded.settings_json,
                updated_at = excluded.updated_at",
            params![entity_id, integration_id, json, now],
        )
        .map_err(db_err)?;
        Ok(WriteOutcome::Written)
    }

    fn entity_integrations(&self, entity_id: i64) -> Result<Vec<(String, SettingsMap)>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT integration_id, settings_json FROM form_settings
                 WHERE form_id = ?1 ORDER BY rowid ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![entity_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .map_err(db_err)?;
        Ok(rows
            .filter_map(|r| r.ok())
            .map(|(id, json)| (id, Self::parse_settings(json)))
            .collect())
    }

    fn delete_for_entity(&self, entity_id: i64) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM form_settings WHERE form_id = ?1",
            params![entity_id],
        )
        .map_err(db_err)
    }

    fn get_option(&self, name: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock();
        let json: Option<String> = conn
            .prepare_cached("SELECT value_json FROM options WHERE name = ?1")
            .map_err(db_err)?
            .query_row(params![name], |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        Ok(json.and_then(|s| serde_json::from_str(&s).ok()))
    }

    fn set_option(&self, name: &str, value: &Value) -> Result<WriteOutcome> {
        let json = serde_json::to_string(&sanitize_value(value))?;
        let conn = self.conn.lock();
        let existing: Option<String> = conn
            .prepare_cached("SELECT value_json FROM options WHERE name = ?1")
            .map_err(db_err)?
            .query_row(params![name], |row| row.get(0))
            .optional()
            .map_err(db_err)?;
        if existing.as_deref() == Some(json.as_str()) {
            return Ok(WriteOutcome::Unchanged);
        }
        conn.execute(
            "INSERT INTO options (name, value_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                value_json = excluded.value_json,
                updated_at = excluded.updated_at",
            params![name, json, now_millis()],
        )
        .map_err(db_err)?;
        Ok(WriteOutcome::Written)
    }
}
