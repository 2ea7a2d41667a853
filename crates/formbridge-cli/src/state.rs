//! Shared application state.

use std::sync::Arc;

use formbridge_core::FormBridgeConfig;
use formbridge_http::HttpRequestClient;
use formbridge_integrations::{
    default_registry, ActivityLogger, AdapterContext, IntegrationService, SubmissionDispatcher,
};
use formbridge_store::SqliteStore;

/// Everything a command needs, wired once at startup.
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub logger: ActivityLogger,
    pub service: IntegrationService,
}

impl AppState {
    pub fn new(config: &FormBridgeConfig, store: SqliteStore) -> Self {
        let store = Arc::new(store);
        let logger = ActivityLogger::new(store.clone(), config.log_retention_days);
        let ctx = AdapterContext::new(
            store.clone(),
            logger.clone(),
            HttpRequestClient::from_config(config),
        );

        let registry = Arc::new(default_registry(&ctx));
        let dispatcher =
            SubmissionDispatcher::from_config(registry.clone(), store.clone(), logger.clone(), config);
        let service = IntegrationService::new(registry, dispatcher);

        Self {
            store,
            logger,
            service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_registers_builtin_adapters() {
        let dir = tempfile::tempdir().unwrap();
        let config = FormBridgeConfig::from_env(dir.path()).unwrap();
        let store = SqliteStore::open(&config.data_paths.db).unwrap();
        let state = AppState::new(&config, store);

        assert_eq!(state.service.registry().count(), 3);
        assert!(state.service.registry().contains("webhook"));
        assert!(state.store.db_path().starts_with(dir.path()));
    }
}
