//! The integration adapter contract.
//!
//! Concrete adapters implement the platform-specific pieces (metadata,
//! credentials, connection check, delivery). Settings access, validation,
//! field mapping and logging come from the default methods.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use formbridge_core::value::{get_flag, get_string, is_non_empty};
use formbridge_core::{
    ActionDescriptor, AuthField, Error, FieldDescriptor, FieldMapping, IntegrationDescriptor,
    MappingTarget, Result, SettingsField, SettingsMap,
};
use formbridge_http::HttpRequestClient;
use formbridge_store::SettingsStore;

use crate::logger::{ActivityLogger, LogContext};

/// Shared services every adapter is built with.
#[derive(Clone)]
pub struct AdapterContext {
    pub settings: Arc<dyn SettingsStore>,
    pub logger: ActivityLogger,
    pub http: HttpRequestClient,
}

impl AdapterContext {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        logger: ActivityLogger,
        http: HttpRequestClient,
    ) -> Self {
        Self {
            settings,
            logger,
            http,
        }
    }
}

/// Outcome of a connection test.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionResult {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// One submitted form entry.
#[derive(Debug, Clone)]
pub struct Submission {
    pub submission_id: i64,
    pub form_id: i64,
    pub data: SettingsMap,
}

impl Submission {
    /// Build from raw form data; `form_id` must be present as a number or
    /// numeric string.
    pub fn from_form_data(submission_id: i64, data: SettingsMap) -> Result<Self> {
        let form_id = match data.get("form_id") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| Error::validation("Form ID is required"))?;

        Ok(Self {
            submission_id,
            form_id,
            data,
        })
    }
}

/// Adapter that declares non-credential settings.
pub trait Configurable: Send + Sync {
    fn settings_fields(&self) -> Vec<SettingsField>;
}

/// Adapter that declares mapping targets per action.
pub trait FieldMappable: Send + Sync {
    fn field_mapping(&self, action: &str) -> Vec<MappingTarget>;

    fn required_targets(&self, action: &str) -> Vec<MappingTarget> {
        self.field_mapping(action)
            .into_iter()
            .filter(|t| t.required)
            .collect()
    }
}

/// `"<Label> is required"` for every required field without a value.
pub fn required_field_errors(fields: &[FieldDescriptor], settings: &SettingsMap) -> Vec<String> {
    fields
        .iter()
        .filter(|f| f.required)
        .filter(|f| !settings.get(&f.id).map(is_non_empty).unwrap_or(false))
        .map(|f| format!("{} is required", f.label))
        .collect()
}

/// Rules every form configuration must satisfy.
pub fn base_settings_errors(settings: &SettingsMap) -> Vec<String> {
    let mut errors = Vec::new();
    if get_string(settings, "action").is_none() {
        errors.push("Action is required".to_string());
    }
    errors
}

#[async_trait]
pub trait IntegrationAdapter: Send + Sync {
    fn descriptor(&self) -> &IntegrationDescriptor;

    fn context(&self) -> &AdapterContext;

    fn auth_fields(&self) -> Vec<AuthField>;

    fn available_actions(&self) -> Vec<ActionDescriptor>;

    /// Lightweight authenticated call with already-validated credentials.
    async fn check_connection(&self, credentials: &SettingsMap) -> ConnectionResult;

    /// Platform create/update call with the mapped payload.
    async fn deliver(&self, action: &str, payload: SettingsMap, settings: &SettingsMap) -> Result<Value>;

    // ---------------------------------------------------------------
    // Metadata
    // ---------------------------------------------------------------

    fn id(&self) -> &str {
        self.descriptor().id()
    }

    fn name(&self) -> &str {
        self.descriptor().name()
    }

    fn description(&self) -> &str {
        self.descriptor().description()
    }

    fn version(&self) -> &str {
        self.descriptor().version()
    }

    fn icon(&self) -> &str {
        self.descriptor().icon()
    }

    fn color(&self) -> &str {
        self.descriptor().color()
    }

    // ---------------------------------------------------------------
    // Capabilities
    // ---------------------------------------------------------------

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        None
    }

    fn as_field_mappable(&self) -> Option<&dyn FieldMappable> {
        None
    }

    fn settings_fields(&self) -> Vec<SettingsField> {
        self.as_configurable()
            .map(|c| c.settings_fields())
            .unwrap_or_default()
    }

    fn field_mapping(&self, action: &str) -> Vec<MappingTarget> {
        self.as_field_mappable()
            .map(|m| m.field_mapping(action))
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------

    fn global_settings(&self) -> Result<SettingsMap> {
        self.context().settings.get_global(self.id())
    }

    fn form_settings(&self, form_id: i64) -> Result<SettingsMap> {
        self.context().settings.get_for_entity(form_id, self.id())
    }

    fn is_configured(&self) -> bool {
        match self.global_settings() {
            Ok(settings) => required_field_errors(&self.auth_fields(), &settings).is_empty(),
            Err(e) => {
                warn!("Could not load settings for {}: {}", self.id(), e);
                false
            }
        }
    }

    fn is_enabled(&self, settings: &SettingsMap) -> bool {
        get_flag(settings, "enabled") && self.is_configured()
    }

    /// Form-level checks. Overrides start from [`base_settings_errors`].
    fn validate_settings(&self, settings: &SettingsMap) -> Vec<String> {
        base_settings_errors(settings)
    }

    fn validate_global_settings(&self, settings: &SettingsMap) -> Vec<String> {
        required_field_errors(&self.auth_fields(), settings)
    }

    /// Write, then re-read and report whether a non-empty value is stored.
    fn save_global_settings(&self, settings: &SettingsMap) -> Result<bool> {
        let outcome = self.context().settings.set_global(self.id(), settings)?;
        let stored = self.global_settings()?;
        debug!("Saved global settings for {}: {:?}", self.id(), outcome);
        Ok(!stored.is_empty())
    }

    fn save_form_settings(&self, form_id: i64, settings: &SettingsMap) -> Result<bool> {
        let outcome = self
            .context()
            .settings
            .set_for_entity(form_id, self.id(), settings)?;
        let stored = self.form_settings(form_id)?;
        debug!("Saved form {} settings for {}: {:?}", form_id, self.id(), outcome);
        Ok(!stored.is_empty())
    }

    // ---------------------------------------------------------------
    // Connection test
    // ---------------------------------------------------------------

    /// Test candidate credentials. Never fails; missing required credentials
    /// are reported without a network call.
    async fn test_connection(&self, credentials: &SettingsMap) -> ConnectionResult {
        let missing = self.validate_global_settings(credentials);
        let result = if missing.is_empty() {
            self.check_connection(credentials).await
        } else {
            ConnectionResult::failed(missing.join("; "))
        };

        let logger = &self.context().logger;
        match &result.error {
            None => logger.success(self.id(), "Connection test succeeded", LogContext::new()),
            Some(error) => logger.error(
                self.id(),
                format!("Connection test failed: {}", error),
                LogContext::new(),
            ),
        };
        result
    }

    // ---------------------------------------------------------------
    // Submission
    // ---------------------------------------------------------------

    /// Copy mapped values from the submitted data.
    fn map_form_data(&self, mapping: &FieldMapping, form_data: &SettingsMap) -> SettingsMap {
        mapping.apply(form_data)
    }

    /// Resolve the action and the mapped payload, checking required targets
    /// against the mapped output.
    fn prepare_payload(
        &self,
        submission: &Submission,
        settings: &SettingsMap,
    ) -> Result<(String, SettingsMap)> {
        let action =
            get_string(settings, "action").ok_or_else(|| Error::validation("Action is required"))?;
        let mapping = FieldMapping::from_settings(settings)?;
        let payload = self.map_form_data(&mapping, &submission.data);

        let missing: Vec<String> = self
            .as_field_mappable()
            .map(|m| m.required_targets(&action))
            .unwrap_or_default()
            .into_iter()
            .filter(|t| !payload.get(&t.field).map(is_non_empty).unwrap_or(false))
            .map(|t| format!("{} is required", t.label))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Validation(missing));
        }
        Ok((action, payload))
    }

    async fn process_submission(&self, submission: &Submission, settings: &SettingsMap) -> Result<Value> {
        let result = match self.prepare_payload(submission, settings) {
            Ok((action, payload)) => self.deliver(&action, payload, settings).await,
            Err(e) => Err(e),
        };

        let context = LogContext::new()
            .form(submission.form_id)
            .submission(submission.submission_id);
        let logger = &self.context().logger;
        match &result {
            Ok(data) => {
                logger.success(self.id(), "Submission sent", context.data(data.clone()));
            }
            Err(e) => {
                logger.error(
                    self.id(),
                    format!("Submission failed: {}", e.user_message()),
                    context,
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formbridge_store::SqliteStore;
    use serde_json::json;
    use tempfile::TempDir;

    struct CrmAdapter {
        descriptor: IntegrationDescriptor,
        ctx: AdapterContext,
    }

    impl FieldMappable for CrmAdapter {
        fn field_mapping(&self, _action: &str) -> Vec<MappingTarget> {
            vec![
                MappingTarget::new("contact_email", "Email").required(),
                MappingTarget::new("phone", "Phone"),
            ]
        }
    }

    #[async_trait]
    impl IntegrationAdapter for CrmAdapter {
        fn descriptor(&self) -> &IntegrationDescriptor {
            &self.descriptor
        }

        fn context(&self) -> &AdapterContext {
            &self.ctx
        }

        fn auth_fields(&self) -> Vec<AuthField> {
            vec![FieldDescriptor::password("api_key", "API Key").required()]
        }

        fn available_actions(&self) -> Vec<ActionDescriptor> {
            vec![ActionDescriptor::new("subscribe", "Subscribe", "Add a contact")]
        }

        fn as_field_mappable(&self) -> Option<&dyn FieldMappable> {
            Some(self)
        }

        async fn check_connection(&self, _credentials: &SettingsMap) -> ConnectionResult {
            ConnectionResult::ok(None)
        }

        async fn deliver(&self, action: &str, payload: SettingsMap, _settings: &SettingsMap) -> Result<Value> {
            Ok(json!({"action": action, "payload": payload}))
        }
    }

    fn test_adapter() -> (CrmAdapter, Arc<SqliteStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path()).unwrap());
        let ctx = AdapterContext::new(
            store.clone(),
            ActivityLogger::new(store.clone(), 30),
            HttpRequestClient::new(),
        );
        let adapter = CrmAdapter {
            descriptor: IntegrationDescriptor::new("crm", "CRM"),
            ctx,
        };
        (adapter, store, dir)
    }

    fn map(value: Value) -> SettingsMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_base_validation() {
        let (adapter, _store, _dir) = test_adapter();
        assert_eq!(adapter.validate_settings(&SettingsMap::new()), vec!["Action is required"]);
        assert!(adapter
            .validate_settings(&map(json!({"action": "subscribe"})))
            .is_empty());
        assert_eq!(
            adapter.validate_global_settings(&map(json!({"api_key": "  "}))),
            vec!["API Key is required"]
        );
    }

    #[test]
    fn test_configured_follows_global_settings() {
        let (adapter, _store, _dir) = test_adapter();
        assert!(!adapter.is_configured());
        assert!(!adapter.is_enabled(&map(json!({"enabled": true}))));

        assert!(adapter.save_global_settings(&map(json!({"api_key": "k1"}))).unwrap());
        assert!(adapter.is_configured());
        assert!(adapter.is_enabled(&map(json!({"enabled": "1"}))));
        assert!(!adapter.is_enabled(&map(json!({"enabled": false}))));
    }

    #[test]
    fn test_save_round_trip_is_sanitized_and_idempotent() {
        let (adapter, _store, _dir) = test_adapter();
        let input = map(json!({"api_key": "<b>k1</b>", "double_optin": true, "retries": "3"}));

        assert!(adapter.save_global_settings(&input).unwrap());
        let stored = adapter.global_settings().unwrap();
        assert_eq!(
            Value::Object(stored.clone()),
            json!({"api_key": "k1", "double_optin": true, "retries": 3})
        );

        // Unchanged value still verifies as saved.
        assert!(adapter.save_global_settings(&stored).unwrap());
        assert_eq!(adapter.global_settings().unwrap(), stored);
    }

    #[test]
    fn test_save_empty_reports_false() {
        let (adapter, _store, _dir) = test_adapter();
        assert!(!adapter.save_form_settings(4, &SettingsMap::new()).unwrap());
        assert!(adapter
            .save_form_settings(4, &map(json!({"enabled": true, "action": "subscribe"})))
            .unwrap());
        assert_eq!(adapter.form_settings(4).unwrap()["action"], "subscribe");
    }

    #[test]
    fn test_submission_form_id() {
        let sub = Submission::from_form_data(1, map(json!({"form_id": "12"}))).unwrap();
        assert_eq!(sub.form_id, 12);
        let sub = Submission::from_form_data(1, map(json!({"form_id": 7}))).unwrap();
        assert_eq!(sub.form_id, 7);
        assert!(Submission::from_form_data(1, map(json!({"email": "x"}))).is_err());
    }

    #[tokio::test]
    async fn test_process_submission_maps_exactly() {
        let (adapter, _store, _dir) = test_adapter();
        let submission = Submission::from_form_data(
            10,
            map(json!({"form_id": 2, "email": "a@b.com", "unused": "x"})),
        )
        .unwrap();
        let settings = map(json!({
            "action": "subscribe",
            "field_mapping": {"contact_email": "email", "phone": "phone_number"}
        }));

        let result = adapter.process_submission(&submission, &settings).await.unwrap();
        assert_eq!(result["payload"], json!({"contact_email": "a@b.com"}));
    }

    #[tokio::test]
    async fn test_process_submission_requires_mapped_targets() {
        let (adapter, _store, _dir) = test_adapter();
        let submission =
            Submission::from_form_data(11, map(json!({"form_id": 2, "name": "Ann"}))).unwrap();
        let settings = map(json!({"action": "subscribe", "field_mapping": {"contact_email": "email"}}));

        match adapter.process_submission(&submission, &settings).await {
            Err(Error::Validation(errors)) => assert_eq!(errors, vec!["Email is required"]),
            other => panic!("unexpected result: {:?}", other),
        }

        let logs = adapter
            .context()
            .logger
            .get_logs(&formbridge_store::LogFilter::for_integration("crm"), 10, 0)
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].submission_id, Some(11));
        assert_eq!(logs[0].status, formbridge_store::LogLevel::Error);
    }

    #[tokio::test]
    async fn test_connection_missing_credentials_skips_network() {
        let (adapter, _store, _dir) = test_adapter();
        let result = adapter.test_connection(&SettingsMap::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("API Key is required"));
    }
}
