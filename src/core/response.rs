//! Handler responses and the success envelope

use crate::core::error::PipelineError;
use crate::metadata::{Registry, SchemaId};
use crate::transform::TransformOptions;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

/// What a bound handler returns
pub type HandlerResult = Result<HandlerResponse, PipelineError>;

/// Status and optional JSON body produced by a handler
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl HandlerResponse {
    pub fn ok(body: impl Serialize) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    pub fn created(body: impl Serialize) -> Self {
        Self::with_status(StatusCode::CREATED, body)
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }

    /// Any status with a body; a body that fails to serialize becomes null
    pub fn with_status(status: StatusCode, body: impl Serialize) -> Self {
        let body = serde_json::to_value(body).unwrap_or_else(|err| {
            tracing::error!(error = %err, "response body could not be serialized");
            Value::Null
        });
        Self {
            status,
            body: Some(body),
        }
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// Pagination block of a list response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: u64,
    pub current_page: u64,
    pub each_page: u64,
    pub last_page: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(total: u64, current_page: u64, each_page: u64) -> Self {
        let last_page = if each_page == 0 {
            0
        } else {
            total.div_ceil(each_page)
        };
        Self {
            total,
            current_page,
            each_page,
            last_page,
            has_next: current_page < last_page,
            has_prev: current_page > 1,
        }
    }
}

/// `{ status, data, meta? }` success body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl ResponseEnvelope {
    pub fn success(status: StatusCode, data: Value, meta: Option<PaginationMeta>) -> Self {
        Self {
            status: status.as_u16(),
            data,
            meta,
        }
    }

    /// Wrap into a handler response carrying the same status
    pub fn into_handler_response(self) -> HandlerResponse {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        HandlerResponse::with_status(status, self)
    }
}

/// Output shaped by [`ResponseTransformer::transform`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Shaped {
    Data(Value),
    Paginated { data: Value, meta: PaginationMeta },
}

/// Shapes handler output through a response schema
pub struct ResponseTransformer;

impl ResponseTransformer {
    /// Run `data` through `plain_to_class` then `class_to_plain` of `schema`
    ///
    /// With pagination and a list, the list is shaped element by element and
    /// returned with its pagination block.
    pub fn transform(
        registry: &Registry,
        schema: &SchemaId,
        data: &Value,
        pagination: Option<PaginationMeta>,
    ) -> Result<Shaped, PipelineError> {
        let options = TransformOptions::default();
        let shaped = registry
            .plain_to_class(schema, data, &options)?
            .to_plain(registry, &options)?;

        Ok(match pagination {
            Some(meta) if data.is_array() => Shaped::Paginated { data: shaped, meta },
            _ => Shaped::Data(shaped),
        })
    }
}
