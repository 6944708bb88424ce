//! Typed error handling for the request pipeline
//!
//! Every failure that can leave a middleware chain or a handler is a
//! [`PipelineError`]. Each category knows its HTTP status and a stable error
//! code, so the dispatcher adapter can turn any of them into a JSON response.
//!
//! # Error Categories
//!
//! - [`ValidationErrors`]: one or more property error groups (400)
//! - [`TransformError`]: a custom transform function failed (500)
//! - [`ConfigError`]: a declaration references something that does not exist
//! - [`RequestError`]: HTTP level failures raised by middlewares and handlers
//!
//! # Example
//!
//! ```rust,ignore
//! async fn profile(self: Arc<Self>, req: RequestData) -> HandlerResult {
//!     let user = req.extension::<CurrentUser>().ok_or_else(|| PipelineError::unauthorized("Unauthorized"))?;
//!     Ok(HandlerResponse::ok(json!({ "user": user.email })))
//! }
//! ```

use crate::validation::ValidationErrors;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type flowing through middleware chains and handlers
#[derive(Debug)]
pub enum PipelineError {
    /// Payload validation produced at least one error group
    Validation(ValidationErrors),

    /// A custom transform function failed
    Transform(TransformError),

    /// A declaration could not be resolved
    Config(ConfigError),

    /// HTTP/Request errors
    Request(RequestError),

    /// Unexpected failures (collaborator errors, broken invariants)
    Internal(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Validation(e) => write!(f, "{}", e),
            PipelineError::Transform(e) => write!(f, "{}", e),
            PipelineError::Config(e) => write!(f, "{}", e),
            PipelineError::Request(e) => write!(f, "{}", e),
            PipelineError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Validation(e) => Some(e),
            PipelineError::Transform(e) => Some(e),
            PipelineError::Config(e) => Some(e),
            PipelineError::Request(e) => Some(e),
            PipelineError::Internal(_) => None,
        }
    }
}

/// Error body written to the client
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// HTTP status code, repeated in the body
    pub status_code: u16,
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Correlation id for this failure
    pub request_id: String,
    /// RFC 3339 time the response was produced
    pub timestamp: String,
    /// Structured details (validation error groups)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl PipelineError {
    /// 400 with a plain message
    pub fn bad_request(message: impl Into<String>) -> Self {
        PipelineError::Request(RequestError::BadRequest {
            message: message.into(),
        })
    }

    /// 401 with a plain message
    pub fn unauthorized(message: impl Into<String>) -> Self {
        PipelineError::Request(RequestError::Unauthorized {
            message: message.into(),
        })
    }

    /// 403 with a plain message
    pub fn forbidden(message: impl Into<String>) -> Self {
        PipelineError::Request(RequestError::Forbidden {
            message: message.into(),
        })
    }

    /// 404 with a plain message
    pub fn not_found(message: impl Into<String>) -> Self {
        PipelineError::Request(RequestError::NotFound {
            message: message.into(),
        })
    }

    /// 409 with a plain message
    pub fn conflict(message: impl Into<String>) -> Self {
        PipelineError::Request(RequestError::Conflict {
            message: message.into(),
        })
    }

    /// 500 with a plain message
    pub fn internal(message: impl Into<String>) -> Self {
        PipelineError::Internal(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Transform(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Request(e) => e.status_code(),
            PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "VALIDATION_ERROR",
            PipelineError::Transform(_) => "TRANSFORM_ERROR",
            PipelineError::Config(_) => "CONFIG_ERROR",
            PipelineError::Request(e) => e.error_code(),
            PipelineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The validation error groups, if this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            PipelineError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            status_code: self.status_code().as_u16(),
            code: self.error_code().to_string(),
            message: self.to_string(),
            request_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            errors: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            PipelineError::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

impl From<ValidationErrors> for PipelineError {
    fn from(err: ValidationErrors) -> Self {
        PipelineError::Validation(err)
    }
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Which way a conversion was running when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// plain data -> typed instance
    ToClass,
    /// typed instance -> plain data
    ToPlain,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToClass => write!(f, "toClass"),
            Direction::ToPlain => write!(f, "toPlain"),
        }
    }
}

/// A custom transform function returned an error
///
/// The source error is carried untouched; the engine never interprets it.
#[derive(Debug)]
pub struct TransformError {
    pub property: String,
    pub direction: Direction,
    pub source: anyhow::Error,
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} transform failed for '{}': {}",
            self.direction, self.property, self.source
        )
    }
}

impl std::error::Error for TransformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<TransformError> for PipelineError {
    fn from(err: TransformError) -> Self {
        PipelineError::Transform(err)
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors related to declarations and configuration files
#[derive(Debug)]
pub enum ConfigError {
    /// A declared route names a handler the controller does not bind
    UnboundHandler { controller: String, handler: String },

    /// A declaration references a schema that was never declared
    UnknownSchema { schema: String, referenced_by: String },

    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnboundHandler {
                controller,
                handler,
            } => {
                write!(
                    f,
                    "Controller '{}' declares route '{}' but binds no handler for it",
                    controller, handler
                )
            }
            ConfigError::UnknownSchema {
                schema,
                referenced_by,
            } => {
                write!(
                    f,
                    "Schema '{}' referenced by {} is not declared",
                    schema, referenced_by
                )
            }
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err)
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors raised while serving a request
#[derive(Debug)]
pub enum RequestError {
    BadRequest { message: String },
    Unauthorized { message: String },
    Forbidden { message: String },
    NotFound { message: String },
    Conflict { message: String },
    /// The request body is not valid JSON
    InvalidJson { message: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::BadRequest { message }
            | RequestError::Unauthorized { message }
            | RequestError::Forbidden { message }
            | RequestError::NotFound { message }
            | RequestError::Conflict { message } => write!(f, "{}", message),
            RequestError::InvalidJson { message } => {
                write!(f, "Invalid JSON: {}", message)
            }
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RequestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden { .. } => StatusCode::FORBIDDEN,
            RequestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RequestError::Conflict { .. } => StatusCode::CONFLICT,
            RequestError::InvalidJson { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::BadRequest { .. } => "BAD_REQUEST",
            RequestError::Unauthorized { .. } => "UNAUTHORIZED",
            RequestError::Forbidden { .. } => "FORBIDDEN",
            RequestError::NotFound { .. } => "NOT_FOUND",
            RequestError::Conflict { .. } => "CONFLICT",
            RequestError::InvalidJson { .. } => "INVALID_JSON",
        }
    }
}

impl From<RequestError> for PipelineError {
    fn from(err: RequestError) -> Self {
        PipelineError::Request(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Request(RequestError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        // Keep typed errors that were boxed into anyhow on the way up
        match err.downcast::<PipelineError>() {
            Ok(pipeline_err) => pipeline_err,
            Err(err) => PipelineError::Internal(err.to_string()),
        }
    }
}
