//! Key-value settings persistence with a global and a per-entity scope.

use formbridge_core::{Result, SettingsMap};
use serde_json::Value;

/// What a write did to the stored value.
///
/// Storage failures surface as `Err`, so an unchanged value is never
/// mistaken for a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Two-scope settings store. Implementations sanitize every write.
pub trait SettingsStore: Send + Sync {
    /// Settings of one integration; empty when never saved.
    fn get_global(&self, integration_id: &str) -> Result<SettingsMap>;

    fn set_global(&self, integration_id: &str, settings: &SettingsMap) -> Result<WriteOutcome>;

    /// Settings of one integration for one entity (form); empty when never saved.
    fn get_for_entity(&self, entity_id: i64, integration_id: &str) -> Result<SettingsMap>;

    fn set_for_entity(
        &self,
        entity_id: i64,
        integration_id: &str,
        settings: &SettingsMap,
    ) -> Result<WriteOutcome>;

    /// Every integration record of one entity, in first-saved order.
    fn entity_integrations(&self, entity_id: i64) -> Result<Vec<(String, SettingsMap)>>;

    /// Remove every record of one entity. Returns the number removed.
    fn delete_for_entity(&self, entity_id: i64) -> Result<usize>;

    /// Installation-wide option, e.g. `enable_logging`.
    fn get_option(&self, name: &str) -> Result<Option<Value>>;

    fn set_option(&self, name: &str, value: &Value) -> Result<WriteOutcome>;
}
