//! Schema and property metadata records

use super::stamp::{Seq, SeqList, Stamped, offer};
use crate::validation::Validator;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Identifier of a schema type, resolved through the registry at transform time
///
/// Nested schema references hold an id instead of a direct reference, so
/// mutually-referencing schemas can be declared in either order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(String);

impl SchemaId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A custom conversion applied to a single property value
pub type TransformFn = Arc<dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync>;

/// Custom `toPlain` / `toClass` functions for a property
///
/// When present for a direction, the function replaces every default rule.
#[derive(Clone, Default)]
pub struct TransformFns {
    to_plain: Option<TransformFn>,
    to_class: Option<TransformFn>,
}

impl TransformFns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the function used when producing plain data
    pub fn on_to_plain<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.to_plain = Some(Arc::new(f));
        self
    }

    /// Set the function used when producing a typed instance
    pub fn on_to_class<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.to_class = Some(Arc::new(f));
        self
    }

    pub fn to_plain_fn(&self) -> Option<&TransformFn> {
        self.to_plain.as_ref()
    }

    pub fn to_class_fn(&self) -> Option<&TransformFn> {
        self.to_class.as_ref()
    }
}

impl fmt::Debug for TransformFns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformFns")
            .field("to_plain", &self.to_plain.is_some())
            .field("to_class", &self.to_class.is_some())
            .finish()
    }
}

/// Options of the expose marker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExposeOptions {
    /// Output alias used by `class_to_plain`
    pub name: Option<String>,
    pub groups: Vec<String>,
}

/// Options of the exclude marker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExcludeOptions {
    pub groups: Vec<String>,
}

/// Accumulated metadata of one (schema, property) pair
#[derive(Debug, Clone)]
pub struct PropertyMetadata {
    key: String,
    first_seq: Seq,
    name: Option<Stamped<String>>,
    type_ref: Option<Stamped<SchemaId>>,
    transform: Option<Stamped<TransformFns>>,
    exclude: bool,
    expose: bool,
    groups: BTreeSet<String>,
    validators: SeqList<Validator>,
    default_value: Option<Stamped<Value>>,
}

impl PropertyMetadata {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            first_seq: Seq::MAX,
            name: None,
            type_ref: None,
            transform: None,
            exclude: false,
            expose: false,
            groups: BTreeSet::new(),
            validators: SeqList::default(),
            default_value: None,
        }
    }

    /// The property key on the typed instance
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Output alias, if declared
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|s| s.value.as_str())
    }

    /// Key written by `class_to_plain`
    pub fn output_key(&self) -> &str {
        self.name().unwrap_or(&self.key)
    }

    /// Nested schema reference
    pub fn type_ref(&self) -> Option<&SchemaId> {
        self.type_ref.as_ref().map(|s| &s.value)
    }

    pub fn transform(&self) -> Option<&TransformFns> {
        self.transform.as_ref().map(|s| &s.value)
    }

    pub fn is_excluded(&self) -> bool {
        self.exclude
    }

    pub fn is_exposed(&self) -> bool {
        self.expose
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    /// Validators in declaration order
    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.iter()
    }

    pub fn has_validators(&self) -> bool {
        !self.validators.is_empty()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref().map(|s| &s.value)
    }

    pub(crate) fn first_seq(&self) -> Seq {
        self.first_seq
    }

    // --- merge operations, each touching only the fields it owns ---

    pub(crate) fn touch(&mut self, seq: Seq) {
        self.first_seq = self.first_seq.min(seq);
    }

    pub(crate) fn merge_expose(&mut self, seq: Seq, options: ExposeOptions) {
        self.expose = true;
        if let Some(name) = options.name {
            offer(&mut self.name, seq, name);
        }
        self.groups.extend(options.groups);
    }

    pub(crate) fn merge_exclude(&mut self, options: ExcludeOptions) {
        self.exclude = true;
        self.groups.extend(options.groups);
    }

    pub(crate) fn merge_type(&mut self, seq: Seq, schema: SchemaId) {
        offer(&mut self.type_ref, seq, schema);
    }

    pub(crate) fn merge_transform(&mut self, seq: Seq, fns: TransformFns) {
        offer(&mut self.transform, seq, fns);
    }

    pub(crate) fn merge_default(&mut self, seq: Seq, value: Value) {
        offer(&mut self.default_value, seq, value);
    }

    pub(crate) fn merge_validator(&mut self, seq: Seq, validator: Validator) {
        self.validators.insert(seq, validator);
    }
}

/// Accumulated metadata of one schema type
#[derive(Debug, Clone)]
pub struct ClassMetadata {
    id: SchemaId,
    properties: IndexMap<String, PropertyMetadata>,
    exclude_extraneous_values: bool,
}

impl ClassMetadata {
    pub fn new(id: SchemaId) -> Self {
        Self {
            id,
            properties: IndexMap::new(),
            exclude_extraneous_values: false,
        }
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    /// When true, only declared properties survive `plain_to_class`
    pub fn exclude_extraneous_values(&self) -> bool {
        self.exclude_extraneous_values
    }

    pub fn property(&self, key: &str) -> Option<&PropertyMetadata> {
        self.properties.get(key)
    }

    /// Properties in first-declaration order
    pub fn properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.values()
    }

    /// Get or create the record of a property
    pub fn property_mut(&mut self, key: &str) -> &mut PropertyMetadata {
        self.properties
            .entry(key.to_string())
            .or_insert_with(|| PropertyMetadata::new(key))
    }

    pub(crate) fn mark_exclude_extraneous(&mut self) {
        self.exclude_extraneous_values = true;
    }

    /// Restore first-declaration order after a merge pass
    pub(crate) fn sort_properties(&mut self) {
        self.properties
            .sort_by(|_, a, _, b| a.first_seq().cmp(&b.first_seq()));
    }
}
