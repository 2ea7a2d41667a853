//! Shared helpers: temp-dir backed context and stub API servers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use formbridge_core::SettingsMap;
use formbridge_http::HttpRequestClient;
use formbridge_integrations::{ActivityLogger, AdapterContext};
use formbridge_store::SqliteStore;
use serde_json::Value;
use tempfile::TempDir;

pub struct TestEnv {
    pub ctx: AdapterContext,
    pub store: Arc<SqliteStore>,
    _dir: TempDir,
}

pub fn test_env() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path()).unwrap());
    let ctx = AdapterContext::new(
        store.clone(),
        ActivityLogger::new(store.clone(), 30),
        HttpRequestClient::new(),
    );
    TestEnv {
        ctx,
        store,
        _dir: dir,
    }
}

/// Serve `app` on an ephemeral port; returns its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn map(value: Value) -> SettingsMap {
    value.as_object().cloned().unwrap()
}

/// Nothing listens on port 1.
pub const UNREACHABLE: &str = "http://127.0.0.1:1";
