//! Mailchimp audience subscriptions.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use formbridge_core::value::{as_lenient_string, lenient_bool, lenient_opt_string, lenient_string};
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

pub const ID: &str = "mailchimp";
const ADD_SUBSCRIBER: &str = "add_subscriber";

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(deserialize_with = "lenient_string")]
    api_key: String,
}

impl Credentials {
    /// Data center suffix of `<key>-<dc>`.
    fn data_center(&self) -> Option<&str> {
        self.api_key
            .trim()
            .rsplit_once('-')
            .map(|(_, dc)| dc)
            .filter(|dc| !dc.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
struct AudienceSettings {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    list_id: Option<String>,
    /// Comma-separated.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    tags: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    double_optin: bool,
}

pub struct MailchimpAdapter {
    descriptor: IntegrationDescriptor,
    ctx: AdapterContext,
    base_url: Option<String>,
}

impl MailchimpAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self {
            descriptor: IntegrationDescriptor::new(ID, "Mailchimp")
                .with_description("Add form submitters to a Mailchimp audience")
                .with_icon("dashicons-email-alt")
                .with_color("#ffe01b"),
            ctx,
            base_url: None,
        }
    }

    /// Use a fixed API root instead of the data-center URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn api_base(&self, creds: &Credentials) -> Result<String> {
        if let Some(base) = &self.base_url {
            return Ok(base.clone());
        }
        creds
            .data_center()
            .map(|dc| format!("https://{}.api.mailchimp.com/3.0", dc))
            .ok_or_else(|| {
                Error::Configuration("Invalid API key format: expected <key>-<data center>".into())
            })
    }

    fn auth(creds: &Credentials) -> RequestArgs {
        RequestArgs::new().basic_auth("formbridge", Some(creds.api_key.trim().to_string()))
    }
}

impl Configurable for MailchimpAdapter {
    fn settings_fields(&self) -> Vec<SettingsField> {
        vec![
            FieldDescriptor::text("list_id", "Audience")
                .required()
                .with_description("Audience (list) ID that receives new subscribers"),
            FieldDescriptor::text("tags", "Tags").with_description("Comma-separated tags"),
            FieldDescriptor::checkbox("double_optin", "Double opt-in")
                .with_default(false)
                .with_description("Send a confirmation email before subscribing"),
        ]
    }
}

impl FieldMappable for MailchimpAdapter {
    fn field_mapping(&self, action: &str) -> Vec<MappingTarget> {
        match action {
            ADD_SUBSCRIBER => vec![
                MappingTarget::new("email_address", "Email Address").required(),
                MappingTarget::new("FNAME", "First Name"),
                MappingTarget::new("LNAME", "Last Name"),
                MappingTarget::new("PHONE", "Phone Number"),
            ],
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl IntegrationAdapter for MailchimpAdapter {
    fn descriptor(&self) -> &IntegrationDescriptor {
        &self.descriptor
    }

    fn context(&self) -> &AdapterContext {
        &self.ctx
    }

    fn auth_fields(&self) -> Vec<AuthField> {
        vec![FieldDescriptor::password("api_key", "API Key")
            .required()
            .with_description("Account > Extras > API keys, e.g. abc123-us21")]
    }

    fn available_actions(&self) -> Vec<ActionDescriptor> {
        vec![ActionDescriptor::new(
            ADD_SUBSCRIBER,
            "Add Subscriber",
            "Add a new contact to an audience",
        )]
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }

    fn as_field_mappable(&self) -> Option<&dyn FieldMappable> {
        Some(self)
    }

    fn validate_settings(&self, settings: &SettingsMap) -> Vec<String> {
        let mut errors = base_settings_errors(settings);
        let audience: AudienceSettings = parse_settings(settings).unwrap_or_default();
        if audience.list_id.is_none() {
            errors.push("Audience is required".to_string());
        }
        errors
    }

    async fn check_connection(&self, credentials: &SettingsMap) -> ConnectionResult {
        let creds: Credentials = match parse_settings(credentials) {
            Ok(c) => c,
            Err(e) => return ConnectionResult::failed(e.user_message()),
        };
        let base = match self.api_base(&creds) {
            Ok(b) => b,
            Err(e) => return ConnectionResult::failed(e.user_message()),
        };

        let resp = self
            .ctx
            .http
            .get(&format!("{}/ping", base), Self::auth(&creds))
            .await;
        if resp.success {
            ConnectionResult::ok(Some(resp.data))
        } else {
            ConnectionResult::failed(resp.error_message())
        }
    }

    async fn deliver(&self, action: &str, mut payload: SettingsMap, settings: &SettingsMap) -> Result<Value> {
        if action != ADD_SUBSCRIBER {
            return Err(Error::validation(format!("Unsupported action: {}", action)));
        }
        let creds: Credentials = load_credentials(self)?;
        let audience: AudienceSettings = parse_settings(settings)?;
        let list_id = audience
            .list_id
            .ok_or_else(|| Error::validation("Audience is required"))?;

        let email = payload
            .remove("email_address")
            .as_ref()
            .and_then(as_lenient_string)
            .ok_or_else(|| Error::validation("Email Address is required"))?;

        let status = if audience.double_optin { "pending" } else { "subscribed" };
        let mut body = json!({
            "email_address": email,
            "status": status,
            "merge_fields": payload,
        });
        if let Some(tags) = &audience.tags {
            let tags: Vec<&str> = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            body["tags"] = json!(tags);
        }

        let url = format!("{}/lists/{}/members", self.api_base(&creds)?, list_id);
        debug!("Mailchimp subscribe to list {}", list_id);
        self.ctx
            .http
            .post(&url, Self::auth(&creds).json(body))
            .await
            .into_result()
    }
}
