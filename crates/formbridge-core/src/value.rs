//! Lenient readers for loosely typed settings values.
//!
//! Stored settings pass through sanitization, which turns numeric-looking
//! strings into numbers. Credentials such as `"12345"` therefore come back as
//! `12345`; these helpers read them back as text.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::SettingsMap;

/// `true` when the value counts as "filled in" for required-field checks.
pub fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Checkbox-style truthiness: `true`, non-zero numbers, `"1"`, `"true"`, `"yes"`, `"on"`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        _ => false,
    }
}

/// Read a scalar as a string. Objects, arrays and null yield `None`.
pub fn as_lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-blank string value of `key`, trimmed.
pub fn get_string(settings: &SettingsMap, key: &str) -> Option<String> {
    settings
        .get(key)
        .and_then(as_lenient_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Checkbox value of `key`; absent means `false`.
pub fn get_flag(settings: &SettingsMap, key: &str) -> bool {
    settings.get(key).map(is_truthy).unwrap_or(false)
}

/// Serde helper: accept strings, numbers or booleans as a `String`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    as_lenient_string(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected a string, found {}", value)))
}

/// Serde helper: like [`lenient_string`] but `null`/blank become `None`.
pub fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(as_lenient_string)
        .filter(|s| !s.trim().is_empty()))
}

/// Serde helper: checkbox truthiness as a `bool`.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(is_truthy).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_empty() {
        assert!(!is_non_empty(&json!(null)));
        assert!(!is_non_empty(&json!("   ")));
        assert!(!is_non_empty(&json!(false)));
        assert!(!is_non_empty(&json!([])));
        assert!(is_non_empty(&json!(0)));
        assert!(is_non_empty(&json!("k1")));
    }

    #[test]
    fn test_truthy() {
        for v in [json!(true), json!(1), json!("1"), json!("yes"), json!("ON")] {
            assert!(is_truthy(&v), "{} should be truthy", v);
        }
        for v in [json!(false), json!(0), json!("0"), json!(""), json!(null)] {
            assert!(!is_truthy(&v), "{} should be falsy", v);
        }
    }

    #[test]
    fn test_lenient_deserialize() {
        #[derive(Deserialize)]
        struct Creds {
            #[serde(deserialize_with = "lenient_string")]
            api_key: String,
            #[serde(default, deserialize_with = "lenient_opt_string")]
            region: Option<String>,
        }

        let creds: Creds = serde_json::from_value(json!({"api_key": 12345, "region": ""})).unwrap();
        assert_eq!(creds.api_key, "12345");
        assert!(creds.region.is_none());
    }

    #[test]
    fn test_get_string_trims() {
        let settings = json!({"list_id": "  abc  ", "blank": " "});
        let settings = settings.as_object().unwrap();
        assert_eq!(get_string(settings, "list_id").as_deref(), Some("abc"));
        assert!(get_string(settings, "blank").is_none());
        assert!(get_string(settings, "missing").is_none());
    }
}
