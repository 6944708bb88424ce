//! Transform engine
//!
//! Converts plain JSON data into typed [`Instance`]s and back, following the
//! property metadata of the target schema:
//!
//! - `plain_to_class` applies default values, drops excluded, out-of-group and
//!   (optionally) undeclared keys, then runs a custom `toClass` function, a
//!   nested schema conversion, or passes the raw value through. Input keys are
//!   never renamed.
//! - `class_to_plain` applies the same exclusion rules, then a custom
//!   `toPlain` function or a recursive flatten, and writes every value under
//!   the property's output alias.

pub mod filters;
pub mod utils;

use crate::core::error::{Direction, PipelineError, TransformError};
use crate::core::field::{FieldValue, Instance};
use crate::metadata::{PropertyMetadata, Registry, SchemaId, TransformFns, ValidationOptions};
use serde_json::{Map, Value};
use utils::{should_exclude_extraneous, should_exclude_property};

/// Options of a single conversion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOptions {
    /// Active group filter
    pub groups: Option<Vec<String>>,
    /// Overrides the schema's own `exclude_extraneous_values` flag when set
    pub exclude_extraneous_values: Option<bool>,
}

impl TransformOptions {
    pub fn with_groups(groups: &[&str]) -> Self {
        Self {
            groups: Some(groups.iter().map(|g| g.to_string()).collect()),
            exclude_extraneous_values: None,
        }
    }
}

impl From<&ValidationOptions> for TransformOptions {
    fn from(options: &ValidationOptions) -> Self {
        Self {
            groups: options.groups.clone(),
            exclude_extraneous_values: options.forbid_non_whitelisted,
        }
    }
}

/// Result of `plain_to_class`: one instance, or one per array element
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    One(Instance),
    Many(Vec<Transformed>),
}

impl Transformed {
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Transformed::One(instance) => Some(instance),
            Transformed::Many(_) => None,
        }
    }

    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Transformed::One(instance) => Some(instance),
            Transformed::Many(_) => None,
        }
    }

    /// Every instance, depth first, in input order
    pub fn instances(&self) -> Vec<&Instance> {
        match self {
            Transformed::One(instance) => vec![instance],
            Transformed::Many(items) => items.iter().flat_map(Transformed::instances).collect(),
        }
    }

    /// Convert back to plain data, keeping the list shape
    pub fn to_plain(
        &self,
        registry: &Registry,
        options: &TransformOptions,
    ) -> Result<Value, PipelineError> {
        match self {
            Transformed::One(instance) => class_to_plain(registry, instance, options),
            Transformed::Many(items) => items
                .iter()
                .map(|item| item.to_plain(registry, options))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }
}

impl From<Transformed> for FieldValue {
    fn from(transformed: Transformed) -> Self {
        match transformed {
            Transformed::One(instance) => FieldValue::Nested(instance),
            Transformed::Many(items) => FieldValue::List(items.into_iter().map(Into::into).collect()),
        }
    }
}

/// Convert plain data into a typed instance of `schema`
///
/// A JSON array converts element by element into [`Transformed::Many`].
pub fn plain_to_class(
    registry: &Registry,
    schema: &SchemaId,
    plain: &Value,
    options: &TransformOptions,
) -> Result<Transformed, PipelineError> {
    match plain {
        Value::Array(items) => items
            .iter()
            .map(|item| plain_to_class(registry, schema, item, options))
            .collect::<Result<Vec<_>, _>>()
            .map(Transformed::Many),
        _ => plain_to_instance(registry, schema, plain, options).map(Transformed::One),
    }
}

/// Convert a sequence, preserving order and length
pub fn plain_to_class_many(
    registry: &Registry,
    schema: &SchemaId,
    items: &[Value],
    options: &TransformOptions,
) -> Result<Vec<Transformed>, PipelineError> {
    items
        .iter()
        .map(|item| plain_to_class(registry, schema, item, options))
        .collect()
}

fn plain_to_instance(
    registry: &Registry,
    schema: &SchemaId,
    plain: &Value,
    options: &TransformOptions,
) -> Result<Instance, PipelineError> {
    let class = registry.schema(schema);
    if class.is_none() {
        tracing::warn!(%schema, "converting into an undeclared schema, keys pass through");
    }

    let empty = Map::new();
    let input = match plain {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            tracing::debug!(%schema, value = %other, "non-object input converts to an empty instance");
            &empty
        }
    };

    let mut instance = Instance::new(schema.clone());

    if let Some(class) = class {
        for property in class.properties() {
            if let Some(default) = property.default_value() {
                if input.get(property.key()).is_none_or(Value::is_null) {
                    instance.set(property.key(), default.clone());
                }
            }
        }
    }

    let exclude_extraneous = should_exclude_extraneous(options, class);

    for (key, value) in input {
        let property = class.and_then(|c| c.property(key));

        if should_exclude_property(property, options) {
            continue;
        }
        if exclude_extraneous && property.is_none() {
            continue;
        }
        // explicit null counts as missing: a defaulted property keeps its
        // default instead of taking the null from the second pass
        if value.is_null() && instance.contains(key) {
            continue;
        }

        let stored = to_class_value(registry, property, key, value, options)?;
        instance.set(key.as_str(), stored);
    }

    tracing::debug!(%schema, fields = instance.len(), "plain data converted");
    Ok(instance)
}

fn to_class_value(
    registry: &Registry,
    property: Option<&PropertyMetadata>,
    key: &str,
    value: &Value,
    options: &TransformOptions,
) -> Result<FieldValue, PipelineError> {
    let Some(property) = property else {
        return Ok(FieldValue::Plain(value.clone()));
    };

    if let Some(to_class) = property.transform().and_then(TransformFns::to_class_fn) {
        return to_class(value.clone())
            .map(FieldValue::Plain)
            .map_err(|source| {
                TransformError {
                    property: key.to_string(),
                    direction: Direction::ToClass,
                    source,
                }
                .into()
            });
    }

    match property.type_ref() {
        Some(nested) => nested_to_class(registry, nested, value, options),
        None => Ok(FieldValue::Plain(value.clone())),
    }
}

fn nested_to_class(
    registry: &Registry,
    schema: &SchemaId,
    value: &Value,
    options: &TransformOptions,
) -> Result<FieldValue, PipelineError> {
    if registry.schema(schema).is_none() {
        tracing::warn!(%schema, "nested schema is not declared, value passes through");
        return Ok(FieldValue::Plain(value.clone()));
    }

    match value {
        Value::Object(_) => plain_to_instance(registry, schema, value, options).map(FieldValue::Nested),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(_) | Value::Array(_) => nested_to_class(registry, schema, item, options),
                other => Ok(FieldValue::Plain(other.clone())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::List),
        other => Ok(FieldValue::Plain(other.clone())),
    }
}

/// Convert a typed instance into plain data
pub fn class_to_plain(
    registry: &Registry,
    instance: &Instance,
    options: &TransformOptions,
) -> Result<Value, PipelineError> {
    let class = registry.schema(instance.schema());
    let mut output = Map::new();

    for (key, field) in instance.fields() {
        let property = class.and_then(|c| c.property(key));

        if should_exclude_property(property, options) {
            continue;
        }

        let value = match property
            .and_then(PropertyMetadata::transform)
            .and_then(TransformFns::to_plain_fn)
        {
            Some(to_plain) => to_plain(field.to_value()).map_err(|source| TransformError {
                property: key.to_string(),
                direction: Direction::ToPlain,
                source,
            })?,
            None => field_to_plain(registry, field, options)?,
        };

        let output_key = property.map_or(key, PropertyMetadata::output_key);
        output.insert(output_key.to_string(), value);
    }

    Ok(Value::Object(output))
}

/// Convert a sequence of instances, preserving order and length
pub fn class_to_plain_many(
    registry: &Registry,
    instances: &[Instance],
    options: &TransformOptions,
) -> Result<Vec<Value>, PipelineError> {
    instances
        .iter()
        .map(|instance| class_to_plain(registry, instance, options))
        .collect()
}

fn field_to_plain(
    registry: &Registry,
    field: &FieldValue,
    options: &TransformOptions,
) -> Result<Value, PipelineError> {
    match field {
        FieldValue::Plain(value) => Ok(value.clone()),
        FieldValue::Nested(instance) => class_to_plain(registry, instance, options),
        FieldValue::List(items) => items
            .iter()
            .map(|item| field_to_plain(registry, item, options))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::SchemaDecl;
    use crate::metadata::MetadataStore;
    use serde_json::json;

    fn registry(decls: Vec<SchemaDecl>) -> Registry {
        let mut store = MetadataStore::new();
        for decl in decls {
            store.declare_schema_with(decl);
        }
        store.freeze()
    }

    fn one(transformed: Transformed) -> Instance {
        transformed.into_instance().expect("single instance")
    }

    #[test]
    fn test_defaults_fill_missing_and_null() {
        let mut decl = SchemaDecl::new("Settings");
        decl.property("theme").default_value(json!("light"));
        decl.property("lang").default_value(json!("en"));
        let registry = registry(vec![decl]);

        let id = SchemaId::new("Settings");
        let instance = one(
            registry
                .plain_to_class(&id, &json!({ "lang": null }), &TransformOptions::default())
                .unwrap(),
        );

        assert_eq!(instance.to_value(), json!({ "theme": "light", "lang": "en" }));
    }

    #[test]
    fn test_input_keys_are_never_renamed() {
        let mut decl = SchemaDecl::new("User");
        decl.property("user_name").expose_as("userName");
        let registry = registry(vec![decl]);

        let id = SchemaId::new("User");
        let instance = one(
            registry
                .plain_to_class(&id, &json!({ "user_name": "ada" }), &TransformOptions::default())
                .unwrap(),
        );
        assert!(instance.contains("user_name"));

        let plain = registry
            .class_to_plain(&instance, &TransformOptions::default())
            .unwrap();
        assert_eq!(plain, json!({ "userName": "ada" }));
    }

    #[test]
    fn test_excluded_property_is_dropped_both_ways() {
        let mut decl = SchemaDecl::new("Account");
        decl.property("password").exclude();
        let registry = registry(vec![decl]);

        let id = SchemaId::new("Account");
        let instance = one(
            registry
                .plain_to_class(&id, &json!({ "password": "x", "id": 1 }), &TransformOptions::default())
                .unwrap(),
        );
        assert!(!instance.contains("password"));

        let mut stored = Instance::new(id);
        stored.set("id", json!(1));
        stored.set("password", json!("hash"));
        let plain = registry
            .class_to_plain(&stored, &TransformOptions::default())
            .unwrap();
        assert_eq!(plain, json!({ "id": 1 }));
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let mut address = SchemaDecl::new("Address");
        address.property("city").expose_as("town");
        let mut user = SchemaDecl::new("User");
        user.property("home").type_of("Address");
        user.property("past").type_of("Address");
        let registry = registry(vec![user, address]);

        let input = json!({
            "home": { "city": "Paris" },
            "past": [{ "city": "Lyon" }, 7, null],
        });
        let instance = one(
            registry
                .plain_to_class(&SchemaId::new("User"), &input, &TransformOptions::default())
                .unwrap(),
        );

        let home = instance.get("home").and_then(FieldValue::as_nested).unwrap();
        assert_eq!(home.schema(), &SchemaId::new("Address"));

        let plain = registry
            .class_to_plain(&instance, &TransformOptions::default())
            .unwrap();
        assert_eq!(
            plain,
            json!({ "home": { "town": "Paris" }, "past": [{ "town": "Lyon" }, 7, null] })
        );
    }

    #[test]
    fn test_null_nested_value_passes_through() {
        let mut user = SchemaDecl::new("User");
        user.property("home").type_of("Address");
        let registry = registry(vec![user, SchemaDecl::new("Address")]);

        let instance = one(
            registry
                .plain_to_class(&SchemaId::new("User"), &json!({ "home": null }), &TransformOptions::default())
                .unwrap(),
        );
        assert_eq!(instance.get("home"), Some(&FieldValue::Plain(Value::Null)));
    }

    #[test]
    fn test_unknown_nested_schema_passes_raw_value() {
        let mut user = SchemaDecl::new("User");
        user.property("home").type_of("Missing");
        let registry = registry(vec![user]);

        let instance = one(
            registry
                .plain_to_class(&SchemaId::new("User"), &json!({ "home": { "a": 1 } }), &TransformOptions::default())
                .unwrap(),
        );
        assert_eq!(instance.get("home"), Some(&FieldValue::Plain(json!({ "a": 1 }))));
    }

    #[test]
    fn test_custom_transform_takes_precedence() {
        let mut decl = SchemaDecl::new("Signup");
        decl.property("email")
            .type_of("Ignored")
            .transform(TransformFns::new().on_to_class(filters::lowercase()));
        let registry = registry(vec![decl, SchemaDecl::new("Ignored")]);

        let instance = one(
            registry
                .plain_to_class(&SchemaId::new("Signup"), &json!({ "email": "A@B.CO" }), &TransformOptions::default())
                .unwrap(),
        );
        assert_eq!(instance.get("email"), Some(&FieldValue::Plain(json!("a@b.co"))));
    }

    #[test]
    fn test_custom_transform_error_propagates() {
        let mut decl = SchemaDecl::new("Money");
        decl.property("amount").transform(
            TransformFns::new().on_to_plain(|_| Err(anyhow::anyhow!("currency service down"))),
        );
        let registry = registry(vec![decl]);

        let mut instance = Instance::new(SchemaId::new("Money"));
        instance.set("amount", json!(10));

        let err = registry
            .class_to_plain(&instance, &TransformOptions::default())
            .unwrap_err();
        match err {
            PipelineError::Transform(e) => {
                assert_eq!(e.property, "amount");
                assert_eq!(e.direction, Direction::ToPlain);
                assert_eq!(e.source.to_string(), "currency service down");
            }
            other => panic!("expected transform error, got {other:?}"),
        }
    }

    #[test]
    fn test_array_input_converts_elementwise() {
        let mut decl = SchemaDecl::new("Tag");
        decl.property("label").default_value(json!("untitled"));
        let registry = registry(vec![decl]);

        let transformed = registry
            .plain_to_class(&SchemaId::new("Tag"), &json!([{ "label": "a" }, {}]), &TransformOptions::default())
            .unwrap();
        assert_eq!(transformed.instances().len(), 2);
        assert_eq!(
            transformed.to_plain(&registry, &TransformOptions::default()).unwrap(),
            json!([{ "label": "a" }, { "label": "untitled" }])
        );
    }

    #[test]
    fn test_many_helpers_preserve_order() {
        let registry = registry(vec![SchemaDecl::new("Item")]);
        let id = SchemaId::new("Item");
        let items = vec![json!({ "n": 1 }), json!({ "n": 2 }), json!({ "n": 3 })];

        let converted = plain_to_class_many(&registry, &id, &items, &TransformOptions::default()).unwrap();
        let instances: Vec<Instance> = converted.into_iter().filter_map(Transformed::into_instance).collect();
        let back = class_to_plain_many(&registry, &instances, &TransformOptions::default()).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn test_options_from_validation_options() {
        let options = ValidationOptions {
            groups: Some(vec!["admin".to_string()]),
            forbid_non_whitelisted: Some(true),
            ..Default::default()
        };
        let transform = TransformOptions::from(&options);
        assert_eq!(transform.groups, Some(vec!["admin".to_string()]));
        assert_eq!(transform.exclude_extraneous_values, Some(true));
    }
}
