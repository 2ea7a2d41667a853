//! Boundary calls used by the endpoint layer.
//!
//! Every call answers with a structured response; unknown integration ids
//! become `{success: false, error: "Integration not found: <id>"}`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use formbridge_core::{Error, Result, SettingsMap};

use crate::adapter::{IntegrationAdapter, Submission};
use crate::dispatcher::{DispatchReport, SubmissionDispatcher};
use crate::registry::IntegrationRegistry;

// ---------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TestConnectionRequest {
    pub integration_id: String,
    #[serde(default)]
    pub credentials: SettingsMap,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsType {
    Global,
    Form,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveSettingsRequest {
    pub integration_id: String,
    pub settings_type: SettingsType,
    #[serde(default)]
    pub form_id: Option<i64>,
    #[serde(default)]
    pub settings: SettingsMap,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveSettingsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl SaveSettingsResponse {
    fn rejected(errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: None,
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    AuthFields,
    SettingsFields,
    AvailableActions,
    FieldMapping,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetIntegrationDataRequest {
    pub integration_id: String,
    pub data_type: DataType,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Admin list row.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub icon: String,
    pub color: String,
    pub configured: bool,
}

// ---------------------------------------------------------------
// Service
// ---------------------------------------------------------------

#[derive(Clone)]
pub struct IntegrationService {
    registry: Arc<IntegrationRegistry>,
    dispatcher: SubmissionDispatcher,
}

impl IntegrationService {
    pub fn new(registry: Arc<IntegrationRegistry>, dispatcher: SubmissionDispatcher) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &IntegrationRegistry {
        &self.registry
    }

    fn adapter(&self, id: &str) -> Result<Arc<dyn IntegrationAdapter>> {
        self.registry
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub async fn test_connection(&self, req: TestConnectionRequest) -> ConnectionResponse {
        let adapter = match self.adapter(&req.integration_id) {
            Ok(a) => a,
            Err(e) => {
                return ConnectionResponse {
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        };

        let result = adapter.test_connection(&req.credentials).await;
        ConnectionResponse {
            success: result.success,
            message: result
                .success
                .then(|| format!("Connected to {} successfully", adapter.name())),
            error: result.error,
            data: result.data,
        }
    }

    pub fn save_settings(&self, req: SaveSettingsRequest) -> SaveSettingsResponse {
        let adapter = match self.adapter(&req.integration_id) {
            Ok(a) => a,
            Err(e) => return SaveSettingsResponse::rejected(vec![e.to_string()]),
        };

        let errors = match req.settings_type {
            SettingsType::Global => adapter.validate_global_settings(&req.settings),
            SettingsType::Form if req.form_id.is_none() => vec!["Form ID is required".to_string()],
            SettingsType::Form => adapter.validate_settings(&req.settings),
        };
        if !errors.is_empty() {
            return SaveSettingsResponse::rejected(errors);
        }

        let saved = match (req.settings_type, req.form_id) {
            (SettingsType::Form, Some(form_id)) => adapter.save_form_settings(form_id, &req.settings),
            _ => adapter.save_global_settings(&req.settings),
        };

        match saved {
            Ok(true) => {
                info!("Saved {:?} settings for {}", req.settings_type, adapter.id());
                SaveSettingsResponse {
                    success: true,
                    message: Some("Settings saved successfully".to_string()),
                    errors: Vec::new(),
                }
            }
            Ok(false) => SaveSettingsResponse::rejected(vec!["Failed to save settings".to_string()]),
            Err(e) => {
                error!("Saving settings for {} failed: {}", adapter.id(), e);
                SaveSettingsResponse::rejected(vec![e.user_message()])
            }
        }
    }

    pub fn get_integration_data(&self, req: GetIntegrationDataRequest) -> DataResponse {
        let adapter = match self.adapter(&req.integration_id) {
            Ok(a) => a,
            Err(e) => {
                return DataResponse {
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        };

        let data = match req.data_type {
            DataType::AuthFields => serde_json::to_value(adapter.auth_fields()),
            DataType::SettingsFields => serde_json::to_value(adapter.settings_fields()),
            DataType::AvailableActions => serde_json::to_value(adapter.available_actions()),
            DataType::FieldMapping => {
                let action = req
                    .action
                    .filter(|a| !a.trim().is_empty())
                    .or_else(|| adapter.available_actions().into_iter().next().map(|a| a.id))
                    .unwrap_or_default();
                serde_json::to_value(adapter.field_mapping(&action))
            }
        };

        match data {
            Ok(data) => DataResponse {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => DataResponse {
                error: Some(e.to_string()),
                ..Default::default()
            },
        }
    }

    /// Route one submission. `form_data` must carry `form_id`.
    pub async fn handle_submission(&self, submission_id: i64, form_data: SettingsMap) -> Result<DispatchReport> {
        let submission = Submission::from_form_data(submission_id, form_data)?;
        Ok(self.dispatcher.dispatch(&submission).await)
    }

    pub fn list_integrations(&self) -> Vec<IntegrationSummary> {
        self.registry
            .all()
            .iter()
            .map(|a| IntegrationSummary {
                id: a.id().to_string(),
                name: a.name().to_string(),
                description: a.description().to_string(),
                version: a.version().to_string(),
                icon: a.icon().to_string(),
                color: a.color().to_string(),
                configured: a.is_configured(),
            })
            .collect()
    }
}
