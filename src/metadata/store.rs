//! Metadata store (declaration phase) and frozen registry (serving phase)
//!
//! The store is an explicit object created at process start. Declarations
//! are merged into it, then [`MetadataStore::freeze`] turns it into a
//! [`Registry`]: an immutable, cheaply cloneable view that every in-flight
//! request can read without locking. There is no way back from a registry
//! to a mutable store.

use super::property::{ClassMetadata, PropertyMetadata, SchemaId};
use super::route::{ControllerId, ControllerMetadata, RouteDefinition};
use crate::annotations::{
    Annotation, AnnotationSet, ControllerDecl, ControllerMarker, Declared, PropertyMarker,
    RouteMarker, SchemaDecl, SchemaMarker,
};
use crate::annotations::{Controller, Schema};
use crate::core::error::PipelineError;
use crate::core::field::Instance;
use crate::transform::{self, Transformed, TransformOptions};
use crate::validation::{self, ErrorGroup, ValidationOptions};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Mutable metadata store used while declarations are collected
#[derive(Debug, Default)]
pub struct MetadataStore {
    schemas: HashMap<SchemaId, ClassMetadata>,
    controllers: HashMap<ControllerId, ControllerMetadata>,
    declared_schemas: HashSet<SchemaId>,
    declared_controllers: HashSet<ControllerId>,
}

impl MetadataStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the record of a schema type
    pub fn schema_mut(&mut self, id: &SchemaId) -> &mut ClassMetadata {
        self.schemas
            .entry(id.clone())
            .or_insert_with(|| ClassMetadata::new(id.clone()))
    }

    /// Get or create the record of a (schema, property) pair
    pub fn property_mut(&mut self, schema: &SchemaId, key: &str) -> &mut PropertyMetadata {
        self.schema_mut(schema).property_mut(key)
    }

    /// Get or create the record of a controller type
    pub fn controller_mut(&mut self, id: &ControllerId) -> &mut ControllerMetadata {
        self.controllers
            .entry(id.clone())
            .or_insert_with(|| ControllerMetadata::new(id.clone()))
    }

    /// Get or create the record of a (controller, handler) pair
    pub fn route_mut(&mut self, controller: &ControllerId, handler: &str) -> &mut RouteDefinition {
        self.controller_mut(controller).route_mut(handler)
    }

    /// All routes of a controller, empty when none were declared
    pub fn routes(&self, controller: &ControllerId) -> &[RouteDefinition] {
        self.controllers
            .get(controller)
            .map(|c| c.routes())
            .unwrap_or(&[])
    }

    pub fn schema(&self, id: &SchemaId) -> Option<&ClassMetadata> {
        self.schemas.get(id)
    }

    pub fn controller(&self, id: &ControllerId) -> Option<&ControllerMetadata> {
        self.controllers.get(id)
    }

    /// Merge a set of declarations into the store
    ///
    /// The result does not depend on the order of the set: every field is
    /// written through a declaration-sequence keyed primitive, and record
    /// ordering is restored from first declaration afterwards.
    pub fn apply(&mut self, annotations: impl IntoIterator<Item = Declared>) {
        let mut touched_schemas = BTreeSet::new();
        let mut touched_controllers = BTreeSet::new();

        for Declared { seq, annotation } in annotations {
            match annotation {
                Annotation::Schema { schema, marker } => {
                    let class = self.schema_mut(&schema);
                    match marker {
                        SchemaMarker::ExcludeExtraneousValues => class.mark_exclude_extraneous(),
                    }
                }
                Annotation::Property {
                    schema,
                    property,
                    marker,
                } => {
                    let prop = self.property_mut(&schema, &property);
                    prop.touch(seq);
                    match marker {
                        PropertyMarker::Expose(options) => prop.merge_expose(seq, options),
                        PropertyMarker::Exclude(options) => prop.merge_exclude(options),
                        PropertyMarker::Type(nested) => prop.merge_type(seq, nested),
                        PropertyMarker::Transform(fns) => prop.merge_transform(seq, fns),
                        PropertyMarker::DefaultValue(value) => prop.merge_default(seq, value),
                        PropertyMarker::Validate(validator) => prop.merge_validator(seq, validator),
                    }
                    touched_schemas.insert(schema);
                }
                Annotation::Controller { controller, marker } => {
                    let record = self.controller_mut(&controller);
                    match marker {
                        ControllerMarker::BasePath(path) => record.merge_base_path(seq, path),
                        ControllerMarker::UseMiddleware(middleware) => {
                            record.merge_middleware(seq, middleware)
                        }
                    }
                }
                Annotation::Route {
                    controller,
                    handler,
                    marker,
                } => {
                    let route = self.route_mut(&controller, &handler);
                    route.touch(seq);
                    match marker {
                        RouteMarker::Verb { method, path } => route.merge_verb(seq, method, path),
                        RouteMarker::UseMiddleware(middleware) => {
                            route.merge_middleware(seq, middleware)
                        }
                        RouteMarker::Validate { location, spec } => {
                            route.merge_validation(seq, location, spec)
                        }
                    }
                    touched_controllers.insert(controller);
                }
            }
        }

        for id in touched_schemas {
            self.schema_mut(&id).sort_properties();
        }
        for id in touched_controllers {
            self.controller_mut(&id).sort_routes();
        }
    }

    /// Collect and merge the declarations of a schema type
    ///
    /// A type is declared once; later calls for the same type are no-ops.
    pub fn declare_schema<S: Schema>(&mut self) -> &mut Self {
        if !self.declared_schemas.insert(S::schema_id()) {
            tracing::debug!(schema = S::NAME, "schema already declared, skipping");
            return self;
        }
        let mut decl = SchemaDecl::new(S::NAME);
        S::declare(&mut decl);
        self.declare_schema_with(decl)
    }

    /// Merge a hand-built schema declaration
    pub fn declare_schema_with(&mut self, decl: SchemaDecl) -> &mut Self {
        let id = decl.id().clone();
        self.schema_mut(&id);
        self.apply(decl.into_annotations());
        tracing::debug!(schema = %id, "schema declared");
        self
    }

    /// Collect and merge the declarations of a controller type
    ///
    /// A type is declared once; later calls for the same type are no-ops.
    pub fn declare_controller<C: Controller>(&mut self) -> &mut Self {
        if !self.declared_controllers.insert(ControllerId::new(C::NAME)) {
            tracing::debug!(controller = C::NAME, "controller already declared, skipping");
            return self;
        }
        let mut decl = ControllerDecl::new(C::NAME);
        C::declare(&mut decl);
        self.declare_controller_with(decl)
    }

    /// Merge a hand-built controller declaration
    pub fn declare_controller_with(&mut self, decl: ControllerDecl) -> &mut Self {
        let id = decl.id().clone();
        self.controller_mut(&id);
        self.apply(decl.into_annotations());
        tracing::debug!(controller = %id, "controller declared");
        self
    }

    /// Merge a raw annotation set
    pub fn declare(&mut self, annotations: AnnotationSet) -> &mut Self {
        self.apply(annotations);
        self
    }

    /// End the declaration phase
    pub fn freeze(self) -> Registry {
        tracing::debug!(
            schemas = self.schemas.len(),
            controllers = self.controllers.len(),
            "metadata store frozen"
        );
        Registry {
            inner: Arc::new(RegistryInner {
                schemas: self.schemas,
                controllers: self.controllers,
            }),
        }
    }
}

#[derive(Debug)]
struct RegistryInner {
    schemas: HashMap<SchemaId, ClassMetadata>,
    controllers: HashMap<ControllerId, ControllerMetadata>,
}

/// Frozen, read-only metadata shared by route composition and every request
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn schema(&self, id: &SchemaId) -> Option<&ClassMetadata> {
        self.inner.schemas.get(id)
    }

    pub fn controller(&self, id: &ControllerId) -> Option<&ControllerMetadata> {
        self.inner.controllers.get(id)
    }

    /// All routes of a controller, empty when none were declared
    pub fn routes(&self, controller: &ControllerId) -> &[RouteDefinition] {
        self.controller(controller)
            .map(|c| c.routes())
            .unwrap_or(&[])
    }

    pub fn schema_ids(&self) -> Vec<&SchemaId> {
        self.inner.schemas.keys().collect()
    }

    /// Convert plain data into a typed instance (or a list of them)
    pub fn plain_to_class(
        &self,
        schema: &SchemaId,
        plain: &Value,
        options: &TransformOptions,
    ) -> Result<Transformed, PipelineError> {
        transform::plain_to_class(self, schema, plain, options)
    }

    /// Convert a typed instance back into plain data
    pub fn class_to_plain(
        &self,
        instance: &Instance,
        options: &TransformOptions,
    ) -> Result<Value, PipelineError> {
        transform::class_to_plain(self, instance, options)
    }

    /// Run every declared validator of the instance's schema
    pub async fn validate(&self, instance: &Instance) -> Result<Vec<ErrorGroup>, PipelineError> {
        self.validate_with(instance, &ValidationOptions::default())
            .await
    }

    pub async fn validate_with(
        &self,
        instance: &Instance,
        options: &ValidationOptions,
    ) -> Result<Vec<ErrorGroup>, PipelineError> {
        validation::validate(self, instance, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::HttpMethod;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = MetadataStore::new();
        let id = SchemaId::new("User");
        store.property_mut(&id, "email");
        store.property_mut(&id, "email");
        assert_eq!(store.schema(&id).unwrap().properties().count(), 1);
    }

    #[test]
    fn test_routes_empty_for_unknown_controller() {
        let store = MetadataStore::new();
        assert!(store.routes(&ControllerId::new("Nope")).is_empty());
    }

    #[test]
    fn test_freeze_keeps_records() {
        let mut store = MetadataStore::new();
        let controller = ControllerId::new("Auth");
        store.route_mut(&controller, "login");
        let registry = store.freeze();

        let routes = registry.routes(&controller);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method(), HttpMethod::Get);
        assert!(registry.routes(&ControllerId::new("Other")).is_empty());
    }

    struct Login;

    impl Schema for Login {
        const NAME: &'static str = "Login";

        fn declare(decl: &mut SchemaDecl) {
            decl.property("email").expose().required().is_email();
        }
    }

    struct Auth;

    impl Controller for Auth {
        const NAME: &'static str = "Auth";

        fn declare(decl: &mut ControllerDecl) {
            decl.route("login").post("/login").validate_body::<Login>();
        }

        fn bind(self: Arc<Self>, _handler: &str) -> Option<crate::server::Handler> {
            None
        }
    }

    #[test]
    fn test_declaring_a_type_twice_is_idempotent() {
        let mut once = MetadataStore::new();
        once.declare_schema::<Login>().declare_controller::<Auth>();

        let mut twice = MetadataStore::new();
        twice
            .declare_schema::<Login>()
            .declare_schema::<Login>()
            .declare_controller::<Auth>()
            .declare_controller::<Auth>();

        let id = SchemaId::new("Login");
        let email = twice.schema(&id).unwrap().property("email").unwrap();
        assert_eq!(email.validators().count(), 2);
        assert_eq!(
            twice.schema(&id).unwrap().properties().count(),
            once.schema(&id).unwrap().properties().count()
        );
        assert_eq!(twice.routes(&ControllerId::new("Auth")).len(), 1);
    }

    #[tokio::test]
    async fn test_redeclared_schema_reports_each_message_once() {
        let mut store = MetadataStore::new();
        store.declare_schema::<Login>().declare_schema::<Login>();
        let registry = store.freeze();

        let instance = registry
            .plain_to_class(
                &SchemaId::new("Login"),
                &serde_json::json!({ "password": "x" }),
                &TransformOptions::default(),
            )
            .unwrap()
            .into_instance()
            .unwrap();
        let groups = registry.validate(&instance).await.unwrap();

        assert_eq!(
            serde_json::to_value(&groups).unwrap(),
            serde_json::json!([{ "email": ["email is required", "Value must be a valid email"] }])
        );
    }
}
