//! Typed instances and their field values
//!
//! A typed instance is a structural record tagged with the schema it was
//! produced from. Nested schema values stay typed so that `class_to_plain`
//! can apply the nested schema's own exposure rules and aliases.

use crate::metadata::SchemaId;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A field value held by an [`Instance`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Raw data passed through unchanged
    Plain(Value),
    /// A nested typed instance
    Nested(Instance),
    /// A sequence whose elements may be nested instances
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Raw view of the value, keys unaliased
    ///
    /// This is what validators see.
    pub fn to_value(&self) -> Value {
        match self {
            FieldValue::Plain(value) => value.clone(),
            FieldValue::Nested(instance) => instance.to_value(),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_value).collect()),
        }
    }

    /// Check if the value is JSON null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Plain(Value::Null))
    }

    /// Get the nested instance if this field holds one
    pub fn as_nested(&self) -> Option<&Instance> {
        match self {
            FieldValue::Nested(instance) => Some(instance),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Plain(value)
    }
}

/// A typed record produced by `plain_to_class`
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    schema: SchemaId,
    fields: IndexMap<String, FieldValue>,
}

impl Instance {
    /// Create an empty instance of a schema
    pub fn new(schema: SchemaId) -> Self {
        Self {
            schema,
            fields: IndexMap::new(),
        }
    }

    /// The schema this instance belongs to
    pub fn schema(&self) -> &SchemaId {
        &self.schema
    }

    /// Get a field by property key
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Set a field, keeping the position of an existing key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Check whether the property holds a value (explicit null counts as held)
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Iterate own properties in assignment order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of own properties
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw JSON view with original keys, no exposure rules applied
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect();
        Value::Object(map)
    }

    /// Deserialize the raw view into a concrete Rust type
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.to_value())
    }
}
