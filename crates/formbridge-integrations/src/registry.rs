//! Registry of integration adapters, keyed by id.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::adapter::IntegrationAdapter;

/// Adapters in registration order with an id index.
///
/// Registering an id twice replaces the earlier adapter in place.
#[derive(Default)]
pub struct IntegrationRegistry {
    adapters: Vec<Arc<dyn IntegrationAdapter>>,
    index: HashMap<String, usize>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn IntegrationAdapter>) {
        let id = adapter.id().to_string();
        match self.index.get(&id) {
            Some(&pos) => {
                warn!("Integration {} registered twice; replacing earlier adapter", id);
                self.adapters[pos] = adapter;
            }
            None => {
                info!("Registered integration: {} ({})", id, adapter.name());
                self.index.insert(id, self.adapters.len());
                self.adapters.push(adapter);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn IntegrationAdapter>> {
        self.index.get(id).map(|&pos| self.adapters[pos].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn all(&self) -> &[Arc<dyn IntegrationAdapter>] {
        &self.adapters
    }

    /// Adapters whose required credentials are saved.
    pub fn configured(&self) -> Vec<Arc<dyn IntegrationAdapter>> {
        self.adapters
            .iter()
            .filter(|a| a.is_configured())
            .cloned()
            .collect()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    pub fn count(&self) -> usize {
        self.adapters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterContext, ConnectionResult};
    use crate::logger::ActivityLogger;
    use async_trait::async_trait;
    use formbridge_core::{
        ActionDescriptor, AuthField, FieldDescriptor, IntegrationDescriptor, Result, SettingsMap,
    };
    use formbridge_http::HttpRequestClient;
    use formbridge_store::{SettingsStore, SqliteStore};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    struct Named {
        descriptor: IntegrationDescriptor,
        ctx: AdapterContext,
    }

    #[async_trait]
    impl IntegrationAdapter for Named {
        fn descriptor(&self) -> &IntegrationDescriptor {
            &self.descriptor
        }

        fn context(&self) -> &AdapterContext {
            &self.ctx
        }

        fn auth_fields(&self) -> Vec<AuthField> {
            vec![FieldDescriptor::text("token", "Token").required()]
        }

        fn available_actions(&self) -> Vec<ActionDescriptor> {
            Vec::new()
        }

        async fn check_connection(&self, _credentials: &SettingsMap) -> ConnectionResult {
            ConnectionResult::ok(None)
        }

        async fn deliver(&self, _action: &str, _payload: SettingsMap, _settings: &SettingsMap) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn test_context() -> (AdapterContext, Arc<SqliteStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path()).unwrap());
        let ctx = AdapterContext::new(
            store.clone(),
            ActivityLogger::new(store.clone(), 30),
            HttpRequestClient::new(),
        );
        (ctx, store, dir)
    }

    fn adapter(ctx: &AdapterContext, id: &str, name: &str) -> Arc<dyn IntegrationAdapter> {
        Arc::new(Named {
            descriptor: IntegrationDescriptor::new(id, name),
            ctx: ctx.clone(),
        })
    }

    #[test]
    fn test_lookup_by_id() {
        let (ctx, _store, _dir) = test_context();
        let mut registry = IntegrationRegistry::new();
        let crm = adapter(&ctx, "crm", "CRM");
        registry.register(crm.clone());
        registry.register(adapter(&ctx, "mail", "Mail"));

        assert!(Arc::ptr_eq(&registry.get("crm").unwrap(), &crm));
        assert!(registry.get("nonexistent").is_none());
        assert!(registry.contains("mail"));
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.ids(), vec!["crm", "mail"]);
    }

    #[test]
    fn test_duplicate_id_replaces_in_place() {
        let (ctx, _store, _dir) = test_context();
        let mut registry = IntegrationRegistry::new();
        registry.register(adapter(&ctx, "crm", "Old"));
        registry.register(adapter(&ctx, "mail", "Mail"));
        registry.register(adapter(&ctx, "crm", "New"));

        assert_eq!(registry.count(), 2);
        assert_eq!(registry.get("crm").unwrap().name(), "New");
        assert_eq!(registry.ids(), vec!["crm", "mail"]);
    }

    #[test]
    fn test_configured_subset() {
        let (ctx, store, _dir) = test_context();
        let mut registry = IntegrationRegistry::new();
        registry.register(adapter(&ctx, "crm", "CRM"));
        registry.register(adapter(&ctx, "mail", "Mail"));
        assert!(registry.configured().is_empty());

        let settings = json!({"token": "t"}).as_object().cloned().unwrap();
        store.set_global("mail", &settings).unwrap();

        let configured = registry.configured();
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].id(), "mail");
    }
}
