//! HubSpot CRM contacts and deals.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use formbridge_core::value::{get_string, lenient_opt_string, lenient_string};
use formbridge_core::{
    ActionDescriptor, AuthField, Error, FieldDescriptor, IntegrationDescriptor, MappingTarget,
    Result, SettingsField, SettingsMap,
};
use formbridge_http::RequestArgs;

use super::{load_credentials, parse_settings};
use crate::adapter::{
    base_settings_errors, AdapterContext, Configurable, ConnectionResult, FieldMappable,
    IntegrationAdapter,
};

pub const ID: &str = "hubspot";
const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";
const CREATE_CONTACT: &str = "create_contact";
const CREATE_DEAL: &str = "create_deal";

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(deserialize_with = "lenient_string")]
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct DealSettings {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pipeline: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    dealstage: Option<String>,
}

pub struct HubSpotAdapter {
    descriptor: IntegrationDescriptor,
    ctx: AdapterContext,
    base_url: String,
}

impl HubSpotAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self {
            descriptor: IntegrationDescriptor::new(ID, "HubSpot")
                .with_description("Create HubSpot contacts and deals from submissions")
                .with_icon("dashicons-groups")
                .with_color("#ff7a59"),
            ctx,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn object_type(action: &str) -> Option<&'static str> {
        match action {
            CREATE_CONTACT => Some("contacts"),
            CREATE_DEAL => Some("deals"),
            _ => None,
        }
    }
}

impl Configurable for HubSpotAdapter {
    fn settings_fields(&self) -> Vec<SettingsField> {
        vec![
            FieldDescriptor::text("pipeline", "Deal Pipeline")
                .with_default("default")
                .with_description("Pipeline ID for new deals"),
            FieldDescriptor::text("dealstage", "Deal Stage")
                .with_description("Stage ID for new deals, e.g. appointmentscheduled"),
        ]
    }
}

impl FieldMappable for HubSpotAdapter {
    fn field_mapping(&self, action: &str) -> Vec<MappingTarget> {
        match action {
            CREATE_CONTACT => vec![
                MappingTarget::new("email", "Email").required(),
                MappingTarget::new("firstname", "First Name"),
                MappingTarget::new("lastname", "Last Name"),
                MappingTarget::new("phone", "Phone Number"),
                MappingTarget::new("company", "Company Name"),
            ],
            CREATE_DEAL => vec![
                MappingTarget::new("dealname", "Deal Name").required(),
                MappingTarget::new("amount", "Amount"),
            ],
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl IntegrationAdapter for HubSpotAdapter {
    fn descriptor(&self) -> &IntegrationDescriptor {
        &self.descriptor
    }

    fn context(&self) -> &AdapterContext {
        &self.ctx
    }

    fn auth_fields(&self) -> Vec<AuthField> {
        vec![FieldDescriptor::password("access_token", "Private App Access Token")
            .required()
            .with_description("Settings > Integrations > Private Apps")]
    }

    fn available_actions(&self) -> Vec<ActionDescriptor> {
        vec![
            ActionDescriptor::new(CREATE_CONTACT, "Create Contact", "Create a CRM contact"),
            ActionDescriptor::new(CREATE_DEAL, "Create Deal", "Create a deal in a pipeline"),
        ]
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }

    fn as_field_mappable(&self) -> Option<&dyn FieldMappable> {
        Some(self)
    }

    fn validate_settings(&self, settings: &SettingsMap) -> Vec<String> {
        let mut errors = base_settings_errors(settings);
        if let Some(action) = get_string(settings, "action") {
            if Self::object_type(&action).is_none() {
                errors.push(format!("Unsupported action: {}", action));
            }
        }
        errors
    }

    async fn check_connection(&self, credentials: &SettingsMap) -> ConnectionResult {
        let creds: Credentials = match parse_settings(credentials) {
            Ok(c) => c,
            Err(e) => return ConnectionResult::failed(e.user_message()),
        };

        let args = RequestArgs::new()
            .bearer(creds.access_token.trim())
            .query("limit", "1");
        let resp = self
            .ctx
            .http
            .get(&format!("{}/crm/v3/objects/contacts", self.base_url), args)
            .await;
        if resp.success {
            ConnectionResult::ok(None)
        } else {
            ConnectionResult::failed(resp.error_message())
        }
    }

    async fn deliver(&self, action: &str, mut payload: SettingsMap, settings: &SettingsMap) -> Result<Value> {
        let object = Self::object_type(action)
            .ok_or_else(|| Error::validation(format!("Unsupported action: {}", action)))?;
        let creds: Credentials = load_credentials(self)?;

        if action == CREATE_DEAL {
            let deal: DealSettings = parse_settings(settings)?;
            if let Some(pipeline) = deal.pipeline {
                payload.insert("pipeline".into(), Value::String(pipeline));
            }
            if let Some(stage) = deal.dealstage {
                payload.insert("dealstage".into(), Value::String(stage));
            }
        }

        let url = format!("{}/crm/v3/objects/{}", self.base_url, object);
        let args = RequestArgs::new()
            .bearer(creds.access_token.trim())
            .json(json!({ "properties": payload }));
        self.ctx.http.post(&url, args).await.into_result()
    }
}
