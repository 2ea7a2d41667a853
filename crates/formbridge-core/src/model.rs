//! Integration data model: descriptors, field declarations, field mapping.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Loosely shaped settings blob as persisted and exchanged at the boundary.
pub type SettingsMap = serde_json::Map<String, Value>;

/// Identity and display metadata for one adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationDescriptor {
    id: String,
    name: String,
    description: String,
    version: String,
    icon: String,
    color: String,
}

impl IntegrationDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            version: "1.0.0".into(),
            icon: "dashicons-admin-plugins".into(),
            color: "#2271b1".into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

/// Input kind of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Password,
    Textarea,
    Checkbox,
    Select,
}

/// One choice of a `select` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Declarative description of a credential or settings input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

/// Credentials an adapter needs.
pub type AuthField = FieldDescriptor;
/// Non-credential configuration knob.
pub type SettingsField = FieldDescriptor;

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            field_type,
            required: false,
            default: None,
            description: String::new(),
            options: Vec::new(),
        }
    }

    pub fn text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, FieldType::Text)
    }

    pub fn password(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, FieldType::Password)
    }

    pub fn checkbox(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, FieldType::Checkbox)
    }

    pub fn select(
        id: impl Into<String>,
        label: impl Into<String>,
        options: impl IntoIterator<Item = (&'static str, &'static str)>,
    ) -> Self {
        let mut field = Self::new(id, label, FieldType::Select);
        field.options = options
            .into_iter()
            .map(|(value, label)| SelectOption {
                value: value.into(),
                label: label.into(),
            })
            .collect();
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// An operation an adapter can perform on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub id: String,
    pub label: String,
    pub description: String,
}

impl ActionDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
        }
    }
}

/// A target-system field that submitted data can be mapped onto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTarget {
    pub field: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

impl MappingTarget {
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Ordered `target field → source field` correspondence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SettingsMap", into = "SettingsMap")]
pub struct FieldMapping {
    entries: Vec<(String, String)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the source for `target`, keeping its original position.
    pub fn insert(&mut self, target: impl Into<String>, source: impl Into<String>) {
        let target = target.into();
        let source = source.into();
        match self.entries.iter_mut().find(|(t, _)| *t == target) {
            Some(entry) => entry.1 = source,
            None => self.entries.push((target, source)),
        }
    }

    pub fn with(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(target, source);
        self
    }

    /// Read the `field_mapping` key of a form settings map.
    ///
    /// Entries with a blank source are dropped; a non-object value is a
    /// validation error.
    pub fn from_settings(settings: &SettingsMap) -> crate::Result<Self> {
        match settings.get("field_mapping") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self::from(map.clone())),
            Some(Value::Array(items)) if items.is_empty() => Ok(Self::default()),
            Some(_) => Err(crate::Error::validation("Field mapping must be an object")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    pub fn source_for(&self, target: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, s)| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy mapped values from `form_data` into a new map keyed by target field.
    ///
    /// Sources missing from `form_data` are skipped; unmapped form fields never
    /// reach the output.
    pub fn apply(&self, form_data: &SettingsMap) -> SettingsMap {
        let mut output = SettingsMap::new();
        for (target, source) in self.iter() {
            if let Some(value) = form_data.get(source) {
                output.insert(target.to_string(), value.clone());
            }
        }
        output
    }
}

impl From<SettingsMap> for FieldMapping {
    fn from(map: SettingsMap) -> Self {
        let mut mapping = Self::default();
        for (target, source) in map {
            if let Some(source) = crate::value::as_lenient_string(&source) {
                if !source.trim().is_empty() && !target.trim().is_empty() {
                    mapping.insert(target, source);
                }
            }
        }
        mapping
    }
}

impl From<FieldMapping> for SettingsMap {
    fn from(mapping: FieldMapping) -> Self {
        mapping
            .entries
            .into_iter()
            .map(|(t, s)| (t, Value::String(s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> SettingsMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_apply_copies_only_mapped_fields() {
        let mapping = FieldMapping::new().with("contact_email", "email");
        let data = map(json!({"email": "a@b.com", "unused": "x"}));

        let out = mapping.apply(&data);
        assert_eq!(Value::Object(out), json!({"contact_email": "a@b.com"}));
    }

    #[test]
    fn test_apply_skips_missing_sources() {
        let mapping = FieldMapping::new()
            .with("contact_email", "email")
            .with("phone", "phone_number");
        let out = mapping.apply(&map(json!({"email": "a@b.com"})));
        assert_eq!(out.len(), 1);
        assert!(!out.contains_key("phone"));
    }

    #[test]
    fn test_same_source_may_feed_several_targets() {
        let mapping = FieldMapping::new().with("email", "mail").with("username", "mail");
        let out = mapping.apply(&map(json!({"mail": "x@y.z"})));
        assert_eq!(out["email"], "x@y.z");
        assert_eq!(out["username"], "x@y.z");
    }

    #[test]
    fn test_from_settings_preserves_order_and_drops_blank_sources() {
        let settings = map(json!({
            "field_mapping": {"LNAME": "last", "FNAME": "first", "PHONE": ""}
        }));
        let mapping = FieldMapping::from_settings(&settings).unwrap();
        let targets: Vec<&str> = mapping.iter().map(|(t, _)| t).collect();
        assert_eq!(targets, vec!["LNAME", "FNAME"]);
    }

    #[test]
    fn test_from_settings_rejects_scalar() {
        let settings = map(json!({"field_mapping": "email"}));
        assert!(FieldMapping::from_settings(&settings).is_err());
        assert!(FieldMapping::from_settings(&SettingsMap::new()).unwrap().is_empty());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut mapping = FieldMapping::new().with("a", "x").with("b", "y");
        mapping.insert("a", "z");
        assert_eq!(mapping.source_for("a"), Some("z"));
        assert_eq!(mapping.iter().next(), Some(("a", "z")));
    }

    #[test]
    fn test_field_descriptor_serializes_type_key() {
        let field = FieldDescriptor::password("api_key", "API Key").required();
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "password");
        assert_eq!(json["required"], true);
        assert!(json.get("options").is_none());
    }
}
