//! Startup registration of the built-in adapters.

use std::sync::Arc;

use tracing::info;

use crate::adapter::AdapterContext;
use crate::adapters::{HubSpotAdapter, MailchimpAdapter, WebhookAdapter};
use crate::registry::IntegrationRegistry;

/// Registry holding every built-in adapter, sharing one context.
pub fn default_registry(ctx: &AdapterContext) -> IntegrationRegistry {
    let mut registry = IntegrationRegistry::new();
    registry.register(Arc::new(MailchimpAdapter::new(ctx.clone())));
    registry.register(Arc::new(HubSpotAdapter::new(ctx.clone())));
    registry.register(Arc::new(WebhookAdapter::new(ctx.clone())));
    info!("{} integrations registered", registry.count());
    registry
}
