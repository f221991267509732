//! Response shapes of the upstream APIs
//!
//! All fields the plugins only display are optional or defaulted, so a
//! payload missing an author, a duration or a thumbnail still decodes.

pub mod downloader;
pub mod quran;
pub mod youtube;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The `{ success, data }` wrapper used by the downloader APIs
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// The payload, if the upstream reported success and sent one
    pub fn into_data(self) -> Option<T> {
        if self.success { self.data } else { None }
    }
}

/// Render a string or number field for display
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Optional text that also accepts numbers; any other shape becomes `None`
///
/// Meant to be used in `deserialize_with` together with `default`
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| display_value(&value))
}

/// Optional number that also accepts numeric strings
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| as_number(&value))
}

/// Optional non-negative count; fractions are truncated
pub fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| {
        as_number(&value)
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u64)
    })
}

/// Optional nested object, dropped when it has the wrong shape
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Value::deserialize(deserializer).map(|value| serde_json::from_value(value).ok())
}

/// List whose malformed elements are skipped; a non-array yields an empty list
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Value::deserialize(deserializer).map(|value| match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Format an integer with comma thousands separators
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope() {
        let ok: Envelope<Value> = serde_json::from_value(json!({"success": true, "data": {"a": 1}})).unwrap();
        assert!(ok.into_data().is_some());

        let failed: Envelope<Value> = serde_json::from_value(json!({"success": false, "data": {"a": 1}})).unwrap();
        assert!(failed.into_data().is_none());

        let bare: Envelope<Value> = serde_json::from_value(json!({})).unwrap();
        assert!(bare.into_data().is_none());
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("3:32")), Some("3:32".to_string()));
        assert_eq!(display_value(&json!(212)), Some("212".to_string()));
        assert_eq!(display_value(&json!("")), None);
        assert_eq!(display_value(&json!(null)), None);
    }

    #[derive(Debug, Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "lenient_text")]
        text: Option<String>,
        #[serde(default, deserialize_with = "lenient_number")]
        number: Option<f64>,
        #[serde(default, deserialize_with = "lenient_count")]
        count: Option<u64>,
        #[serde(default, deserialize_with = "lenient_list")]
        items: Vec<u32>,
    }

    #[test]
    fn test_lenient_fields_tolerate_wrong_types() {
        let typed: Loose = serde_json::from_value(json!({
            "text": 7, "number": "15300", "count": 12.9, "items": [1, "x", 3]
        }))
        .unwrap();
        assert_eq!(typed.text.as_deref(), Some("7"));
        assert_eq!(typed.number, Some(15300.0));
        assert_eq!(typed.count, Some(12));
        assert_eq!(typed.items, vec![1, 3]);

        let wrong: Loose = serde_json::from_value(json!({
            "text": null, "number": {"ms": 1}, "count": "-4", "items": "none"
        }))
        .unwrap();
        assert_eq!(wrong.text, None);
        assert_eq!(wrong.number, None);
        assert_eq!(wrong.count, None);
        assert!(wrong.items.is_empty());

        let missing: Loose = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.text, None);
        assert!(missing.items.is_empty());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
