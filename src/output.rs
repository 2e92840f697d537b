//! Output types: extracted records, batch results, and run statistics.

use crate::error::ImageError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The twelve fields the model is asked to fill, in prompt order.
pub const CUSTOMER_FIELDS: [&str; 12] = [
    "Name",
    "Phone Number",
    "Mobile Number",
    "Email",
    "Street",
    "Street Number",
    "City",
    "ZIP Code",
    "State",
    "Country",
    "Latitude",
    "Longitude",
];

/// One customer record as recovered from a model reply.
///
/// A flat JSON object with the keys in the order the model produced them.
/// Keys and value types are not validated: a record may miss some of
/// [`CUSTOMER_FIELDS`] or carry extra keys, and the export tolerates both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerRecord(Map<String, Value>);

impl CustomerRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields holding a non-empty value.
    pub fn filled_fields(&self) -> usize {
        self.0
            .values()
            .filter(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            })
            .count()
    }
}

impl From<Map<String, Value>> for CustomerRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Result of a batch run over one folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Successfully parsed records, in processing order.
    pub records: Vec<CustomerRecord>,
    /// Images that yielded no record.
    pub failures: Vec<ImageError>,
    pub stats: BatchStats,
}

/// Aggregate statistics for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Image files found in the folder.
    pub total_images: usize,
    /// Images that produced a record.
    pub extracted: usize,
    /// Images that failed at any stage.
    pub failed: usize,
    /// Prompt tokens reported by the backend (0 when not reported).
    pub total_input_tokens: u64,
    /// Completion tokens reported by the backend (0 when not reported).
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> CustomerRecord {
        match value {
            Value::Object(map) => CustomerRecord::from(map),
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn keys_keep_model_order() {
        let r = record(json!({"Phone Number": "1", "Name": "A", "Email": ""}));
        let keys: Vec<&str> = r.keys().collect();
        assert_eq!(keys, vec!["Phone Number", "Name", "Email"]);
    }

    #[test]
    fn filled_fields_ignores_blank_and_null() {
        let r = record(json!({
            "Name": "Jane",
            "Email": "  ",
            "City": null,
            "Latitude": 48.1
        }));
        assert_eq!(r.len(), 4);
        assert_eq!(r.filled_fields(), 2);
    }

    #[test]
    fn serialises_as_flat_object() {
        let r = record(json!({"Name": "A"}));
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"Name":"A"}"#);
    }

    #[test]
    fn customer_fields_are_unique() {
        let mut fields = CUSTOMER_FIELDS.to_vec();
        fields.sort_unstable();
        fields.dedup();
        assert_eq!(fields.len(), 12);
    }
}
