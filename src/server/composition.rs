//! Route composition
//!
//! Turns the frozen route metadata of a controller into dispatch entries:
//! `(method, full_path, middleware chain, bound handler)`. Composition only
//! reads the registry.

use super::handler::Handler;
use super::middleware::{SharedMiddleware, create_validation_middleware, run_chain};
use crate::annotations::Controller;
use crate::core::error::{ConfigError, PipelineError};
use crate::core::request::{Location, RequestData};
use crate::core::response::HandlerResult;
use crate::metadata::{ControllerId, HttpMethod, Registry, RouteDefinition};
use std::fmt;
use std::sync::Arc;

/// Validation middlewares are appended in this order
const VALIDATION_ORDER: [Location; 3] = [Location::Params, Location::Query, Location::Body];

/// Options shared by every controller registration
#[derive(Debug, Clone, Default)]
pub struct RegisterRoutesOptions {
    /// Prefix of every full path, e.g. `/api/v1`
    pub base_path: String,
    /// Run first on every route
    pub global_middlewares: Vec<SharedMiddleware>,
    /// Reject configuration gaps instead of skipping them
    pub strict: bool,
}

impl RegisterRoutesOptions {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    pub fn with_global_middleware(mut self, middleware: SharedMiddleware) -> Self {
        self.global_middlewares.push(middleware);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// A route ready to be mounted on a dispatcher
#[derive(Clone)]
pub struct DispatchEntry {
    pub method: HttpMethod,
    pub full_path: String,
    pub middlewares: Vec<SharedMiddleware>,
    pub handler: Handler,
    pub controller: ControllerId,
    pub handler_name: String,
    registry: Registry,
}

impl DispatchEntry {
    /// Run the middleware chain, then the handler
    ///
    /// The frozen registry is available to both through
    /// [`RequestData::registry`].
    pub async fn dispatch(&self, mut request: RequestData) -> HandlerResult {
        request.insert_extension(self.registry.clone());
        let request = run_chain(&self.middlewares, request).await?;
        (self.handler)(request).await
    }

    /// Middleware names in chain order
    pub fn middleware_names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }
}

impl fmt::Debug for DispatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEntry")
            .field("method", &self.method)
            .field("full_path", &self.full_path)
            .field("middlewares", &self.middleware_names())
            .field("controller", &self.controller)
            .field("handler_name", &self.handler_name)
            .finish()
    }
}

/// Compose the dispatch entries of a controller instance
pub fn compose_routes<C: Controller>(
    registry: &Registry,
    controller: Arc<C>,
    options: &RegisterRoutesOptions,
) -> Result<Vec<DispatchEntry>, PipelineError> {
    let id = C::controller_id();
    let Some(metadata) = registry.controller(&id) else {
        tracing::warn!(controller = %id, "controller has no declarations, nothing to register");
        return Ok(Vec::new());
    };

    let class_middlewares: Vec<SharedMiddleware> = metadata.middlewares().cloned().collect();
    let mut entries = Vec::with_capacity(metadata.routes().len());

    for route in metadata.routes() {
        let Some(handler) = controller.clone().bind(route.handler_name()) else {
            if options.strict {
                return Err(ConfigError::UnboundHandler {
                    controller: id.to_string(),
                    handler: route.handler_name().to_string(),
                }
                .into());
            }
            tracing::warn!(
                controller = %id,
                handler = route.handler_name(),
                "route has no bound handler, skipping"
            );
            continue;
        };

        let mut middlewares: Vec<SharedMiddleware> = options.global_middlewares.clone();
        middlewares.extend(class_middlewares.iter().cloned());
        middlewares.extend(route.middlewares().cloned());
        middlewares.extend(validation_middlewares(registry, &id, route, options.strict)?);

        entries.push(DispatchEntry {
            method: route.method(),
            full_path: format!("{}{}{}", options.base_path, metadata.base_path(), route.path()),
            middlewares,
            handler,
            controller: id.clone(),
            handler_name: route.handler_name().to_string(),
            registry: registry.clone(),
        });
    }

    Ok(entries)
}

fn validation_middlewares(
    registry: &Registry,
    controller: &ControllerId,
    route: &RouteDefinition,
    strict: bool,
) -> Result<Vec<SharedMiddleware>, PipelineError> {
    let mut middlewares = Vec::new();

    for location in VALIDATION_ORDER {
        let Some(spec) = route.validation(location) else {
            continue;
        };

        if registry.schema(&spec.schema).is_none() {
            let referenced_by = format!("{}::{} ({})", controller, route.handler_name(), location);
            if strict {
                return Err(ConfigError::UnknownSchema {
                    schema: spec.schema.to_string(),
                    referenced_by,
                }
                .into());
            }
            tracing::warn!(
                schema = %spec.schema,
                %referenced_by,
                "validation references an undeclared schema, no rule applies"
            );
        }

        middlewares.push(create_validation_middleware(
            location,
            spec.schema.clone(),
            spec.options.clone(),
            registry.clone(),
        ));
    }

    Ok(middlewares)
}

/// Compose and log the dispatch entries of a controller instance
pub fn register_controller<C: Controller>(
    registry: &Registry,
    controller: Arc<C>,
    options: &RegisterRoutesOptions,
) -> Result<Vec<DispatchEntry>, PipelineError> {
    let entries = compose_routes(registry, controller, options)?;
    for entry in &entries {
        tracing::info!("Registered {} {}", entry.method, entry.full_path);
    }
    Ok(entries)
}
