//! Central sanitization applied to every settings write.
//!
//! Objects and arrays recurse, booleans/null/numbers pass through, strings are
//! stripped of markup and then coerced to a number when they are already in
//! canonical numeric form.
//! Running it twice yields the same value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use formbridge_core::SettingsMap;

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap()
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
// Tag opened but never closed, e.g. a trailing `<img src=x onerror=...`.
static OPEN_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[a-zA-Z/!?].*$").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap());

/// Sanitize every value of a settings map.
pub fn sanitize_settings(settings: &SettingsMap) -> SettingsMap {
    settings
        .iter()
        .map(|(k, v)| (k.clone(), sanitize_value(v)))
        .collect()
}

/// Sanitize one value recursively.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_settings(map)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::String(s) => sanitize_string(s),
        Value::Bool(_) | Value::Null | Value::Number(_) => value.clone(),
    }
}

fn sanitize_string(raw: &str) -> Value {
    let text = sanitize_text(raw);
    coerce_numeric(&text).unwrap_or(Value::String(text))
}

/// Strip markup and control characters, collapse whitespace.
pub fn sanitize_text(raw: &str) -> String {
    let text = SCRIPT_STYLE_RE.replace_all(raw, "");
    let text = TAG_RE.replace_all(&text, "");
    let text = OPEN_TAG_RE.replace_all(&text, "");
    let text = WS_RE.replace_all(&text, " ");
    text.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Coerce only when the number prints back as the same text, so `"007"`,
/// `"1.10"` or `"1e3"` stay strings.
fn coerce_numeric(text: &str) -> Option<Value> {
    if !NUMERIC_RE.is_match(text) {
        return None;
    }
    let number = if text.contains(&['.', 'e', 'E'][..]) {
        text.parse::<f64>().ok().and_then(Number::from_f64)?
    } else {
        Number::from(text.parse::<i64>().ok()?)
    };
    (number.to_string() == text).then_some(Value::Number(number))
}
