//! Concrete platform adapters.

pub mod hubspot;
pub mod mailchimp;
pub mod webhook;

pub use hubspot::HubSpotAdapter;
pub use mailchimp::MailchimpAdapter;
pub use webhook::WebhookAdapter;

use formbridge_core::{Error, Result, SettingsMap};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::adapter::IntegrationAdapter;

/// Deserialize a settings map into an adapter's typed credentials/config.
pub(crate) fn parse_settings<T: DeserializeOwned>(settings: &SettingsMap) -> Result<T> {
    serde_json::from_value(Value::Object(settings.clone()))
        .map_err(|e| Error::Configuration(e.to_string()))
}

/// Saved credentials of `adapter`, checked against its required auth fields.
pub(crate) fn load_credentials<T: DeserializeOwned>(adapter: &dyn IntegrationAdapter) -> Result<T> {
    let settings = adapter.global_settings()?;
    let missing = adapter.validate_global_settings(&settings);
    if !missing.is_empty() {
        return Err(Error::Configuration(missing.join("; ")));
    }
    parse_settings(&settings)
}
