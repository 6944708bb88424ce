//! Request middlewares
//!
//! A middleware receives the request data and either passes it on (possibly
//! amended) or stops the chain with an error. Chains run strictly in order.

use crate::core::error::PipelineError;
use crate::core::request::{Location, RequestData};
use crate::metadata::{Registry, SchemaId, ValidationOptions};
use crate::transform::TransformOptions;
use crate::validation::ValidationErrors;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// One stage of a route's middleware chain
///
/// `Ok` continues with the returned request data; `Err` short-circuits the
/// chain and becomes the response.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn handle(&self, request: RequestData) -> Result<RequestData, PipelineError>;
}

/// Middleware as stored in metadata and dispatch entries
pub type SharedMiddleware = Arc<dyn Middleware>;

impl fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Middleware({})", self.name())
    }
}

type MiddlewareFn =
    dyn Fn(RequestData) -> BoxFuture<'static, Result<RequestData, PipelineError>> + Send + Sync;

struct FnMiddleware {
    name: String,
    f: Box<MiddlewareFn>,
}

#[async_trait]
impl Middleware for FnMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, request: RequestData) -> Result<RequestData, PipelineError> {
        (self.f)(request).await
    }
}

/// Build a middleware from an async closure
///
/// ```rust,ignore
/// let require_json = middleware_fn("require_json", |req: RequestData| async move {
///     match req.header("content-type") {
///         Some(ct) if ct.starts_with("application/json") => Ok(req),
///         _ => Err(PipelineError::bad_request("Expected a JSON body")),
///     }
/// });
/// ```
pub fn middleware_fn<F, Fut>(name: &str, f: F) -> SharedMiddleware
where
    F: Fn(RequestData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RequestData, PipelineError>> + Send + 'static,
{
    Arc::new(FnMiddleware {
        name: name.to_string(),
        f: Box::new(move |req| Box::pin(f(req))),
    })
}

/// Validates one request slice against a schema
///
/// Runs `plain_to_class`, then every validator. Any error group stops the
/// chain with a validation failure; otherwise the slice is replaced by
/// `class_to_plain` of the instance.
pub struct ValidationMiddleware {
    name: String,
    location: Location,
    schema: SchemaId,
    options: ValidationOptions,
    registry: Registry,
}

impl ValidationMiddleware {
    pub fn new(
        location: Location,
        schema: SchemaId,
        options: ValidationOptions,
        registry: Registry,
    ) -> Self {
        Self {
            name: format!("validate_{}({})", location, schema),
            location,
            schema,
            options,
            registry,
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn schema(&self) -> &SchemaId {
        &self.schema
    }
}

#[async_trait]
impl Middleware for ValidationMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, mut request: RequestData) -> Result<RequestData, PipelineError> {
        let transform_options = TransformOptions::from(&self.options);

        let transformed =
            self.registry
                .plain_to_class(&self.schema, request.slice(self.location), &transform_options)?;

        let mut groups = Vec::new();
        for instance in transformed.instances() {
            groups.extend(self.registry.validate_with(instance, &self.options).await?);
        }

        if !groups.is_empty() {
            tracing::debug!(
                location = %self.location,
                schema = %self.schema,
                failed = groups.len(),
                "request rejected by validation"
            );
            return Err(PipelineError::Validation(ValidationErrors::new(groups)));
        }

        let normalized = transformed.to_plain(&self.registry, &TransformOptions::default())?;
        request.replace(self.location, normalized);
        Ok(request)
    }
}

/// Create the middleware validating `location` against `schema`
pub fn create_validation_middleware(
    location: Location,
    schema: SchemaId,
    options: ValidationOptions,
    registry: Registry,
) -> SharedMiddleware {
    Arc::new(ValidationMiddleware::new(location, schema, options, registry))
}

/// Run a chain in order, stopping at the first error
pub async fn run_chain(
    middlewares: &[SharedMiddleware],
    mut request: RequestData,
) -> Result<RequestData, PipelineError> {
    for middleware in middlewares {
        tracing::trace!(middleware = middleware.name(), "running middleware");
        request = middleware.handle(request).await?;
    }
    Ok(request)
}
