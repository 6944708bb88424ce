//! Validation engine
//!
//! Runs every declared validator of a typed instance's schema and collects
//! the failures as one [`ErrorGroup`] per failing property. Validators of a
//! property all run, in declaration order, awaited one after the other; a
//! failing validator never stops the next one.
//!
//! The wire shape of the result is a list of single-key records:
//!
//! ```json
//! [{ "email": ["email is required", "Value must be a valid email"] }]
//! ```

pub mod lookup;
pub mod validators;

pub use crate::metadata::ValidationOptions;
pub use lookup::{InMemoryUniqueLookup, UniqueLookup};

use crate::core::error::PipelineError;
use crate::core::field::{FieldValue, Instance};
use crate::metadata::Registry;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What a validator answers: `None` when the value is fine, a message otherwise
pub type ValidatorOutcome = anyhow::Result<Option<String>>;

type ValidatorFn = dyn Fn(String, Value) -> BoxFuture<'static, ValidatorOutcome> + Send + Sync;

/// A named, possibly asynchronous, property check
#[derive(Clone)]
pub struct Validator {
    name: String,
    check: Arc<ValidatorFn>,
}

impl Validator {
    /// Wrap a synchronous check
    pub fn new<F>(name: &str, check: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            check: Arc::new(move |field: String, value: Value| {
                let outcome = check(&field, &value).err();
                futures::future::ready(Ok(outcome)).boxed()
            }),
        }
    }

    /// Wrap an asynchronous check, e.g. one that queries a data store
    ///
    /// An `Err` means the check itself could not run; it aborts validation.
    pub fn from_async<F, Fut>(name: &str, check: F) -> Self
    where
        F: Fn(String, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ValidatorOutcome> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            check: Arc::new(move |field: String, value: Value| check(field, value).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn check(&self, field: &str, value: Value) -> ValidatorOutcome {
        (self.check)(field.to_string(), value).await
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator({})", self.name)
    }
}

/// Failures of a single property, in validator declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorGroup {
    property: String,
    messages: Vec<String>,
}

impl ErrorGroup {
    pub fn new(property: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            property: property.into(),
            messages,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl Serialize for ErrorGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.property, &self.messages)?;
        map.end()
    }
}

/// The error groups of a failed validation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    groups: Vec<ErrorGroup>,
}

impl ValidationErrors {
    pub fn new(groups: Vec<ErrorGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[ErrorGroup] {
        &self.groups
    }

    /// Messages of one property, if it failed
    pub fn get(&self, property: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.property == property)
            .map(|g| g.messages())
    }

    /// Property -> messages view; the wire shape stays a list of groups
    pub fn to_map(&self) -> IndexMap<&str, &[String]> {
        self.groups
            .iter()
            .map(|g| (g.property(), g.messages()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn into_groups(self) -> Vec<ErrorGroup> {
        self.groups
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.groups.serialize(serializer)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed")
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a typed instance against its schema
///
/// Returns the error groups; the instance is valid iff the list is empty.
/// An instance of an undeclared schema has no rules and is always valid.
pub async fn validate(
    registry: &Registry,
    instance: &Instance,
    options: &ValidationOptions,
) -> Result<Vec<ErrorGroup>, PipelineError> {
    let Some(schema) = registry.schema(instance.schema()) else {
        tracing::warn!(
            schema = %instance.schema(),
            "validating an instance of an undeclared schema, no rules apply"
        );
        return Ok(Vec::new());
    };

    let mut groups = Vec::new();

    for property in schema.properties().filter(|p| p.has_validators()) {
        let value = instance
            .get(property.key())
            .map(FieldValue::to_value)
            .unwrap_or(Value::Null);

        if options.skip_missing_properties && value.is_null() {
            continue;
        }

        let mut messages = Vec::new();
        for validator in property.validators() {
            match validator.check(property.key(), value.clone()).await {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(
                        schema = %schema.id(),
                        property = property.key(),
                        validator = validator.name(),
                        error = %err,
                        "validator could not run"
                    );
                    return Err(PipelineError::internal("Validation failed"));
                }
            }
        }

        if !messages.is_empty() {
            groups.push(ErrorGroup::new(property.key(), messages));
        }
    }

    tracing::debug!(schema = %schema.id(), failed = groups.len(), "validation finished");
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::SchemaDecl;
    use crate::metadata::{MetadataStore, SchemaId};
    use serde_json::json;

    fn registry_with(decl: SchemaDecl) -> Registry {
        let mut store = MetadataStore::new();
        store.declare_schema_with(decl);
        store.freeze()
    }

    #[tokio::test]
    async fn test_all_validators_run_in_declaration_order() {
        let mut decl = SchemaDecl::new("Pair");
        decl.property("code")
            .check("first", |_, _| Err("first failed".to_string()))
            .check("second", |_, _| Err("second failed".to_string()));
        let registry = registry_with(decl);

        let instance = Instance::new(SchemaId::new("Pair"));
        let groups = registry.validate(&instance).await.unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].messages(), ["first failed", "second failed"]);
    }

    #[tokio::test]
    async fn test_properties_without_messages_emit_nothing() {
        let mut decl = SchemaDecl::new("User");
        decl.property("name").required();
        decl.property("nickname").expose();
        let registry = registry_with(decl);

        let mut instance = Instance::new(SchemaId::new("User"));
        instance.set("name", json!("Ada"));

        assert!(registry.validate(&instance).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skip_missing_properties() {
        let mut decl = SchemaDecl::new("Patch");
        decl.property("email").required().is_email();
        let registry = registry_with(decl);

        let instance = Instance::new(SchemaId::new("Patch"));
        let options = ValidationOptions {
            skip_missing_properties: true,
            ..Default::default()
        };
        assert!(registry.validate_with(&instance, &options).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_async_validator_is_awaited() {
        let mut decl = SchemaDecl::new("Slow");
        decl.property("token").validate(Validator::from_async(
            "slow",
            |_field: String, value: Value| async move {
                tokio::task::yield_now().await;
                Ok(value.is_null().then(|| "token missing".to_string()))
            },
        ));
        let registry = registry_with(decl);

        let groups = registry
            .validate(&Instance::new(SchemaId::new("Slow")))
            .await
            .unwrap();
        assert_eq!(groups[0].messages(), ["token missing"]);
    }

    #[tokio::test]
    async fn test_failing_collaborator_aborts_validation() {
        let mut decl = SchemaDecl::new("Broken");
        decl.property("email").validate(Validator::from_async(
            "broken",
            |_field: String, _value: Value| async move { Err(anyhow::anyhow!("db down")) },
        ));
        let registry = registry_with(decl);

        let err = registry
            .validate(&Instance::new(SchemaId::new("Broken")))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_undeclared_schema_is_valid() {
        let registry = MetadataStore::new().freeze();
        let groups = registry
            .validate(&Instance::new(SchemaId::new("Ghost")))
            .await
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_validation_errors_lookup_helpers() {
        let errors = ValidationErrors::new(vec![
            ErrorGroup::new("email", vec!["bad".to_string()]),
            ErrorGroup::new("name", vec!["missing".to_string()]),
        ]);
        assert_eq!(errors.get("name"), Some(&["missing".to_string()][..]));
        assert_eq!(errors.get("age"), None);
        assert_eq!(errors.to_map().len(), 2);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!([{ "email": ["bad"] }, { "name": ["missing"] }])
        );
    }
}
