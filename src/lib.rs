//! # decl
//!
//! A metadata-driven request pipeline for axum services.
//!
//! Schemas and controllers declare their behavior as data: exposure and
//! exclusion rules, nested types, custom transforms, default values and
//! validators on schema properties; verbs, paths, middlewares and payload
//! validations on controller handlers. Declarations merge into a
//! [`MetadataStore`](metadata::MetadataStore) in any order, are frozen into a
//! read-only [`Registry`](metadata::Registry), and drive:
//!
//! - **Route composition**: one dispatch entry per declared handler, with the
//!   middleware chain `global + controller + handler + validation`
//! - **Validation**: every validator of every property runs, collecting
//!   `[{ "property": [messages...] }]` error groups
//! - **Transformation**: plain JSON to typed instances and back, honoring
//!   groups, aliases and extraneous-value stripping
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use decl::prelude::*;
//!
//! struct LoginRequest;
//!
//! impl Schema for LoginRequest {
//!     const NAME: &'static str = "LoginRequest";
//!
//!     fn declare(decl: &mut SchemaDecl) {
//!         decl.exclude_extraneous_values();
//!         decl.property("email").expose().required().is_email();
//!         decl.property("password").expose().required().is_string();
//!     }
//! }
//!
//! struct AuthController;
//!
//! impl AuthController {
//!     async fn login(self: Arc<Self>, req: RequestData) -> HandlerResult {
//!         Ok(HandlerResponse::ok(json!({ "email": req.body["email"] })))
//!     }
//! }
//!
//! impl Controller for AuthController {
//!     const NAME: &'static str = "AuthController";
//!
//!     fn declare(decl: &mut ControllerDecl) {
//!         decl.base_path("/auth");
//!         decl.route("login").post("/login").validate_body::<LoginRequest>();
//!     }
//!
//!     fn bind(self: Arc<Self>, handler: &str) -> Option<Handler> {
//!         match handler {
//!             "login" => Some(bind(self, Self::login)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let app = ServerBuilder::new()
//!     .with_config(PipelineConfig::from_yaml_str("base_path: /api/v1")?)
//!     .declare_schema::<LoginRequest>()
//!     .register_controller(AuthController)
//!     .build()?;
//! ```

pub mod annotations;
pub mod config;
pub mod core;
pub mod metadata;
pub mod server;
pub mod transform;
pub mod validation;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Declarations ===
    pub use crate::annotations::{
        Controller, ControllerDecl, PropertyDecl, RouteDecl, Schema, SchemaDecl,
    };

    // === Metadata ===
    pub use crate::metadata::{
        ExcludeOptions, ExposeOptions, HttpMethod, MetadataStore, Registry, SchemaId,
        TransformFns, ValidationOptions,
    };

    // === Core Types ===
    pub use crate::core::{
        FieldValue, HandlerResponse, HandlerResult, Instance, Location, PaginationMeta,
        PipelineError, RequestData, ResponseEnvelope, ResponseTransformer,
    };

    // === Engines ===
    pub use crate::transform::{TransformOptions, Transformed, filters};
    pub use crate::validation::{
        ErrorGroup, InMemoryUniqueLookup, UniqueLookup, ValidationErrors, Validator, validators,
    };

    // === Server ===
    pub use crate::config::PipelineConfig;
    pub use crate::server::{
        DispatchEntry, Handler, Middleware, RegisterRoutesOptions, ServerBuilder, SharedMiddleware,
        bind, compose_routes, create_validation_middleware, handler_fn, into_router, middleware_fn,
        register_controller,
    };

    // === External Dependencies ===
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}
