//! Message metadata values
//!
//! `MetadataValue` is the JSON-shaped value type that may ride along with an
//! encrypted message (in plaintext) or live in the open extension fields of
//! `UserPreferences`. Everything in a tree must survive a JSON round-trip:
//! non-finite numbers cannot, so a single NaN or infinity anywhere in the tree
//! makes the whole value invalid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A JSON-compatible value: string, number, boolean, null, array or object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<MetadataValue>),
    Object(BTreeMap<String, MetadataValue>),
}

/// Recursively validate a metadata tree.
///
/// Scalars are valid when they can be represented in JSON; arrays and objects
/// are valid when every element is.
pub fn validate_metadata_value(value: &MetadataValue) -> bool {
    match value {
        MetadataValue::Null | MetadataValue::Bool(_) | MetadataValue::String(_) => true,
        MetadataValue::Number(n) => n.is_finite(),
        MetadataValue::Array(items) => items.iter().all(validate_metadata_value),
        MetadataValue::Object(fields) => fields.values().all(validate_metadata_value),
    }
}

impl MetadataValue {
    pub fn is_valid(&self) -> bool {
        validate_metadata_value(self)
    }

    /// Convert to a `serde_json::Value`. Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataValue::Null => serde_json::Value::Null,
            MetadataValue::Bool(b) => serde_json::Value::Bool(*b),
            MetadataValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            MetadataValue::String(s) => serde_json::Value::String(s.clone()),
            MetadataValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(MetadataValue::to_json).collect())
            }
            MetadataValue::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for MetadataValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => MetadataValue::Null,
            serde_json::Value::Bool(b) => MetadataValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(MetadataValue::Number)
                .unwrap_or(MetadataValue::Null),
            serde_json::Value::String(s) => MetadataValue::String(s),
            serde_json::Value::Array(items) => {
                MetadataValue::Array(items.into_iter().map(MetadataValue::from).collect())
            }
            serde_json::Value::Object(fields) => MetadataValue::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, MetadataValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Number(n)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Number(n as f64)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<Vec<MetadataValue>> for MetadataValue {
    fn from(items: Vec<MetadataValue>) -> Self {
        MetadataValue::Array(items)
    }
}

impl From<BTreeMap<String, MetadataValue>> for MetadataValue {
    fn from(fields: BTreeMap<String, MetadataValue>) -> Self {
        MetadataValue::Object(fields)
    }
}

/// Plaintext metadata on an encrypted message: a required `type` tag plus
/// arbitrary metadata fields, serialized flat (`{"type": "...", ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, MetadataValue>,
}

impl MessageMetadata {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Check every field. Returns the offending key on failure.
    ///
    /// A field named `type` would shadow the tag once flattened, so it is
    /// rejected as well.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(key) = self.fields.keys().find(|k| k.as_str() == "type") {
            return Err(format!("field '{key}' collides with the metadata type tag"));
        }
        match self
            .fields
            .iter()
            .find(|(_, value)| !validate_metadata_value(value))
        {
            Some((key, _)) => Err(format!("field '{key}' is not a valid metadata value")),
            None => Ok(()),
        }
    }
}
