//! Generic webhook: POST the submission as JSON to a configured URL.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use formbridge_core::value::{get_string, lenient_opt_string};
use formbridge_core::{
    ActionDescriptor, AuthField, Error, FieldDescriptor, FieldMapping, IntegrationDescriptor,
    Result, SettingsField, SettingsMap,
};
use formbridge_http::RequestArgs;

use super::parse_settings;
use crate::adapter::{base_settings_errors, AdapterContext, Configurable, ConnectionResult, IntegrationAdapter};

pub const ID: &str = "webhook";
pub const SECRET_HEADER: &str = "X-FormBridge-Secret";
const SEND: &str = "send";

#[derive(Debug, Default, Deserialize)]
struct WebhookCredentials {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    secret: Option<String>,
    /// Only used by connection tests.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    url: Option<String>,
}

pub struct WebhookAdapter {
    descriptor: IntegrationDescriptor,
    ctx: AdapterContext,
}

impl WebhookAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self {
            descriptor: IntegrationDescriptor::new(ID, "Webhook")
                .with_description("Send submissions to any HTTP endpoint")
                .with_icon("dashicons-rest-api")
                .with_color("#50575e"),
            ctx,
        }
    }

    fn with_secret(args: RequestArgs, secret: Option<&str>) -> RequestArgs {
        match secret {
            Some(secret) => args.header(SECRET_HEADER, secret),
            None => args,
        }
    }
}

fn url_error(url: Option<&str>) -> Option<String> {
    match url {
        None => Some("Webhook URL is required".to_string()),
        Some(u) if !(u.starts_with("http://") || u.starts_with("https://")) => {
            Some("Webhook URL must start with http:// or https://".to_string())
        }
        Some(_) => None,
    }
}

impl Configurable for WebhookAdapter {
    fn settings_fields(&self) -> Vec<SettingsField> {
        vec![FieldDescriptor::text("url", "Webhook URL")
            .required()
            .with_description("Endpoint that receives the submission as JSON")]
    }
}

#[async_trait]
impl IntegrationAdapter for WebhookAdapter {
    fn descriptor(&self) -> &IntegrationDescriptor {
        &self.descriptor
    }

    fn context(&self) -> &AdapterContext {
        &self.ctx
    }

    fn auth_fields(&self) -> Vec<AuthField> {
        vec![FieldDescriptor::password("secret", "Shared Secret")
            .with_description(format!("Sent in the {} header when set", SECRET_HEADER))]
    }

    fn available_actions(&self) -> Vec<ActionDescriptor> {
        vec![ActionDescriptor::new(SEND, "Send Webhook", "POST the submission as JSON")]
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        Some(self)
    }

    fn validate_settings(&self, settings: &SettingsMap) -> Vec<String> {
        let mut errors = base_settings_errors(settings);
        errors.extend(url_error(get_string(settings, "url").as_deref()));
        errors
    }

    /// Without a mapping the whole submission is forwarded.
    fn map_form_data(&self, mapping: &FieldMapping, form_data: &SettingsMap) -> SettingsMap {
        if mapping.is_empty() {
            form_data.clone()
        } else {
            mapping.apply(form_data)
        }
    }

    async fn check_connection(&self, credentials: &SettingsMap) -> ConnectionResult {
        let creds: WebhookCredentials = parse_settings(credentials).unwrap_or_default();
        if let Some(error) = url_error(creds.url.as_deref()) {
            return ConnectionResult::failed(error);
        }
        let url = creds.url.unwrap_or_default();

        let args = Self::with_secret(RequestArgs::new(), creds.secret.as_deref());
        let resp = self.ctx.http.get(&url, args).await;
        if resp.success {
            ConnectionResult::ok(None)
        } else {
            ConnectionResult::failed(resp.error_message())
        }
    }

    async fn deliver(&self, action: &str, payload: SettingsMap, settings: &SettingsMap) -> Result<Value> {
        if action != SEND {
            return Err(Error::validation(format!("Unsupported action: {}", action)));
        }
        let url = get_string(settings, "url");
        if let Some(error) = url_error(url.as_deref()) {
            return Err(Error::validation(error));
        }
        let url = url.unwrap_or_default();

        let creds: WebhookCredentials = parse_settings(&self.global_settings()?)?;
        let args = Self::with_secret(
            RequestArgs::new().json(Value::Object(payload)),
            creds.secret.as_deref(),
        );
        self.ctx.http.post(&url, args).await.into_result()
    }
}
