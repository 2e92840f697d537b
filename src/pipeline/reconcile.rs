//! Optional reshaping of records into the fixed twelve-field layout.
//!
//! Used only with [`crate::config::SchemaMode::Fixed`]. Keys are matched to
//! [`CUSTOMER_FIELDS`] ignoring case, whitespace, `_` and `-`, so
//! `zip_code`, `ZIP Code` and `zipCode` all land in `ZIP Code`. Unrecognised
//! keys are dropped with a warning; missing or `null` fields become empty
//! strings. The first key that maps to a field wins.

use crate::output::{CustomerRecord, CUSTOMER_FIELDS};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

static FIELD_LOOKUP: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    CUSTOMER_FIELDS
        .iter()
        .map(|&field| (normalise_key(field), field))
        .collect()
});

fn normalise_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Canonical field name for `key`, if it is one of the twelve.
pub fn canonical_field(key: &str) -> Option<&'static str> {
    FIELD_LOOKUP.get(&normalise_key(key)).copied()
}

/// Reshape `record` into exactly [`CUSTOMER_FIELDS`], in canonical order.
pub fn reconcile(record: &CustomerRecord) -> CustomerRecord {
    let mut matched: HashMap<&'static str, Value> = HashMap::new();

    for (key, value) in record.iter() {
        match canonical_field(key) {
            Some(field) if matched.contains_key(field) => {
                warn!("Duplicate value for '{}' under key '{}' dropped", field, key);
            }
            Some(field) => {
                matched.insert(field, value.clone());
            }
            None => warn!("Unrecognised field '{}' dropped", key),
        }
    }

    let mut out = CustomerRecord::new();
    for field in CUSTOMER_FIELDS {
        let value = match matched.remove(field) {
            None | Some(Value::Null) => Value::String(String::new()),
            Some(v) => v,
        };
        out.insert(field, value);
    }
    out
}
