//! Schema declarations

use super::{Annotation, AnnotationSet, PropertyMarker, SchemaMarker};
use crate::metadata::{ExcludeOptions, ExposeOptions, SchemaId, TransformFns};
use crate::validation::{UniqueLookup, Validator, validators};
use serde_json::Value;
use std::sync::Arc;

/// A Rust type that describes a payload shape
pub trait Schema {
    /// Registry id of the schema
    const NAME: &'static str;

    /// Declare the schema's markers
    fn declare(decl: &mut SchemaDecl);

    fn schema_id() -> SchemaId {
        SchemaId::new(Self::NAME)
    }
}

/// Collects the markers of one schema type in declaration order
#[derive(Debug)]
pub struct SchemaDecl {
    id: SchemaId,
    annotations: AnnotationSet,
}

impl SchemaDecl {
    pub fn new(id: impl Into<SchemaId>) -> Self {
        Self {
            id: id.into(),
            annotations: AnnotationSet::new(),
        }
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    /// Only declared properties survive `plain_to_class`
    pub fn exclude_extraneous_values(&mut self) -> &mut Self {
        self.annotations.push(Annotation::Schema {
            schema: self.id.clone(),
            marker: SchemaMarker::ExcludeExtraneousValues,
        });
        self
    }

    /// Start declaring markers on a property
    pub fn property(&mut self, key: &str) -> PropertyDecl<'_> {
        PropertyDecl {
            key: key.to_string(),
            decl: self,
        }
    }

    pub fn into_annotations(self) -> AnnotationSet {
        self.annotations
    }
}

/// Markers of a single property; every call records one annotation
pub struct PropertyDecl<'a> {
    decl: &'a mut SchemaDecl,
    key: String,
}

impl PropertyDecl<'_> {
    fn mark(self, marker: PropertyMarker) -> Self {
        self.decl.annotations.push(Annotation::Property {
            schema: self.decl.id.clone(),
            property: self.key.clone(),
            marker,
        });
        self
    }

    pub fn expose(self) -> Self {
        self.mark(PropertyMarker::Expose(ExposeOptions::default()))
    }

    /// Expose under an output alias
    pub fn expose_as(self, name: &str) -> Self {
        self.mark(PropertyMarker::Expose(ExposeOptions {
            name: Some(name.to_string()),
            groups: Vec::new(),
        }))
    }

    pub fn expose_with(self, options: ExposeOptions) -> Self {
        self.mark(PropertyMarker::Expose(options))
    }

    pub fn exclude(self) -> Self {
        self.mark(PropertyMarker::Exclude(ExcludeOptions::default()))
    }

    /// Exclude unless one of these groups is requested
    pub fn exclude_unless(self, groups: &[&str]) -> Self {
        self.mark(PropertyMarker::Exclude(ExcludeOptions {
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }))
    }

    /// Convert the property through a nested schema
    pub fn nested<S: Schema>(self) -> Self {
        self.mark(PropertyMarker::Type(S::schema_id()))
    }

    /// Convert the property through a nested schema, by id
    pub fn type_of(self, schema: impl Into<SchemaId>) -> Self {
        self.mark(PropertyMarker::Type(schema.into()))
    }

    pub fn transform(self, fns: TransformFns) -> Self {
        self.mark(PropertyMarker::Transform(fns))
    }

    /// Value assigned when the input is missing or null
    pub fn default_value(self, value: Value) -> Self {
        self.mark(PropertyMarker::DefaultValue(value))
    }

    /// Attach any validator
    pub fn validate(self, validator: Validator) -> Self {
        self.mark(PropertyMarker::Validate(validator))
    }

    /// Attach a synchronous check
    pub fn check<F>(self, name: &str, check: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validate(Validator::new(name, check))
    }

    pub fn required(self) -> Self {
        self.check("required", validators::required())
    }

    pub fn is_string(self) -> Self {
        self.check("is_string", validators::is_string())
    }

    pub fn is_number(self) -> Self {
        self.check("is_number", validators::is_number())
    }

    pub fn is_email(self) -> Self {
        self.check("is_email", validators::is_email())
    }

    pub fn string_length(self, min: usize, max: usize) -> Self {
        self.check("string_length", validators::string_length(min, max))
    }

    pub fn min_length(self, min: usize) -> Self {
        self.check("min_length", validators::min_length(min))
    }

    pub fn positive(self) -> Self {
        self.check("positive", validators::positive())
    }

    pub fn max_value(self, max: f64) -> Self {
        self.check("max_value", validators::max_value(max))
    }

    pub fn in_list(self, allowed: &[&str]) -> Self {
        let allowed = allowed.iter().map(|s| s.to_string()).collect();
        self.check("in_list", validators::in_list(allowed))
    }

    pub fn date_format(self, format: &'static str) -> Self {
        self.check("date_format", validators::date_format(format))
    }

    /// No existing record may hold this value; `column` defaults to the property key
    pub fn unique(self, lookup: Arc<dyn UniqueLookup>, column: Option<&str>) -> Self {
        self.validate(validators::unique(lookup, column))
    }
}
