//! Controller and route declarations

use super::schema::Schema;
use super::{Annotation, AnnotationSet, ControllerMarker, RouteMarker};
use crate::core::request::Location;
use crate::metadata::{ControllerId, HttpMethod, SchemaId, ValidationOptions, ValidationSpec};
use crate::server::handler::Handler;
use crate::server::middleware::SharedMiddleware;
use std::sync::Arc;

/// A Rust type whose methods serve HTTP routes
///
/// `declare` records the markers; `bind` hands out a handler bound to a live
/// instance for each declared handler name.
///
/// ```rust,ignore
/// impl Controller for ProfileController {
///     const NAME: &'static str = "ProfileController";
///
///     fn declare(decl: &mut ControllerDecl) {
///         decl.base_path("/profile").use_middleware(authenticated());
///         decl.route("show").get("");
///     }
///
///     fn bind(self: Arc<Self>, handler: &str) -> Option<Handler> {
///         match handler {
///             "show" => Some(bind(self, Self::show)),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Controller: Send + Sync + 'static {
    /// Registry id of the controller
    const NAME: &'static str;

    /// Declare the controller's markers
    fn declare(decl: &mut ControllerDecl);

    /// Bind a handler by name; `None` when the controller has no such handler
    fn bind(self: Arc<Self>, handler: &str) -> Option<Handler>;

    fn controller_id() -> ControllerId {
        ControllerId::new(Self::NAME)
    }
}

/// Collects the markers of one controller type in declaration order
#[derive(Debug)]
pub struct ControllerDecl {
    id: ControllerId,
    annotations: AnnotationSet,
}

impl ControllerDecl {
    pub fn new(id: impl Into<ControllerId>) -> Self {
        Self {
            id: id.into(),
            annotations: AnnotationSet::new(),
        }
    }

    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    /// Path prefix shared by every route of the controller
    pub fn base_path(&mut self, path: &str) -> &mut Self {
        self.annotations.push(Annotation::Controller {
            controller: self.id.clone(),
            marker: ControllerMarker::BasePath(path.to_string()),
        });
        self
    }

    /// Class-scoped middleware, run before every route's own middlewares
    pub fn use_middleware(&mut self, middleware: SharedMiddleware) -> &mut Self {
        self.annotations.push(Annotation::Controller {
            controller: self.id.clone(),
            marker: ControllerMarker::UseMiddleware(middleware),
        });
        self
    }

    /// Start declaring markers on a handler
    pub fn route(&mut self, handler: &str) -> RouteDecl<'_> {
        RouteDecl {
            handler: handler.to_string(),
            decl: self,
        }
    }

    pub fn into_annotations(self) -> AnnotationSet {
        self.annotations
    }
}

/// Markers of a single handler; every call records one annotation
pub struct RouteDecl<'a> {
    decl: &'a mut ControllerDecl,
    handler: String,
}

impl RouteDecl<'_> {
    fn mark(self, marker: RouteMarker) -> Self {
        self.decl.annotations.push(Annotation::Route {
            controller: self.decl.id.clone(),
            handler: self.handler.clone(),
            marker,
        });
        self
    }

    pub fn verb(self, method: HttpMethod, path: &str) -> Self {
        self.mark(RouteMarker::Verb {
            method,
            path: path.to_string(),
        })
    }

    pub fn get(self, path: &str) -> Self {
        self.verb(HttpMethod::Get, path)
    }

    pub fn post(self, path: &str) -> Self {
        self.verb(HttpMethod::Post, path)
    }

    pub fn put(self, path: &str) -> Self {
        self.verb(HttpMethod::Put, path)
    }

    pub fn patch(self, path: &str) -> Self {
        self.verb(HttpMethod::Patch, path)
    }

    pub fn delete(self, path: &str) -> Self {
        self.verb(HttpMethod::Delete, path)
    }

    /// Method-scoped middleware
    pub fn use_middleware(self, middleware: SharedMiddleware) -> Self {
        self.mark(RouteMarker::UseMiddleware(middleware))
    }

    /// Validate a request slice against a schema, by id
    pub fn validate(
        self,
        location: Location,
        schema: impl Into<SchemaId>,
        options: ValidationOptions,
    ) -> Self {
        self.mark(RouteMarker::Validate {
            location,
            spec: ValidationSpec {
                schema: schema.into(),
                options,
            },
        })
    }

    pub fn validate_body<S: Schema>(self) -> Self {
        self.validate(Location::Body, S::schema_id(), ValidationOptions::default())
    }

    pub fn validate_body_with<S: Schema>(self, options: ValidationOptions) -> Self {
        self.validate(Location::Body, S::schema_id(), options)
    }

    pub fn validate_query<S: Schema>(self) -> Self {
        self.validate(Location::Query, S::schema_id(), ValidationOptions::default())
    }

    pub fn validate_query_with<S: Schema>(self, options: ValidationOptions) -> Self {
        self.validate(Location::Query, S::schema_id(), options)
    }

    pub fn validate_params<S: Schema>(self) -> Self {
        self.validate(Location::Params, S::schema_id(), ValidationOptions::default())
    }

    pub fn validate_params_with<S: Schema>(self, options: ValidationOptions) -> Self {
        self.validate(Location::Params, S::schema_id(), options)
    }
}
