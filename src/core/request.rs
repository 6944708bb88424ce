//! Inbound request data seen by middlewares and handlers
//!
//! The dispatcher adapter fills a [`RequestData`] from the HTTP request, then
//! hands it down the middleware chain. Validation middlewares replace one
//! slice (body, query or params) with its normalized form; other middlewares
//! attach request-scoped values as typed extensions.

use crate::core::error::PipelineError;
use crate::metadata::{HttpMethod, Registry};
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Which slice of the request a validation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Query,
    Params,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Body => "body",
            Location::Query => "query",
            Location::Params => "params",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a middleware or handler may read from the request
#[derive(Debug, Clone)]
pub struct RequestData {
    pub method: HttpMethod,
    pub path: String,
    pub headers: HeaderMap,
    /// Path parameters, as a JSON object of strings
    pub params: Value,
    /// Query string, as a JSON object of strings
    pub query: Value,
    /// JSON body; an empty body is an empty object
    pub body: Value,
    extensions: Extensions,
}

impl Default for RequestData {
    fn default() -> Self {
        Self::new(HttpMethod::Get, "/")
    }
}

impl RequestData {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            body: Value::Object(Map::new()),
            extensions: Extensions::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Add a header; invalid names or values are ignored
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Read a header as UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Bearer token of the `Authorization` header
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).and_then(Value::as_str)
    }

    /// The slice a validation targets
    pub fn slice(&self, location: Location) -> &Value {
        match location {
            Location::Body => &self.body,
            Location::Query => &self.query,
            Location::Params => &self.params,
        }
    }

    /// Replace a slice, e.g. with its validated and normalized form
    pub fn replace(&mut self, location: Location, value: Value) {
        match location {
            Location::Body => self.body = value,
            Location::Query => self.query = value,
            Location::Params => self.params = value,
        }
    }

    /// Deserialize the body into a concrete type
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, PipelineError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Attach a request-scoped value, replacing one of the same type
    pub fn insert_extension<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(value);
    }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Frozen metadata of the dispatch entry serving this request
    pub fn registry(&self) -> Result<&Registry, PipelineError> {
        self.extension::<Registry>()
            .ok_or_else(|| PipelineError::internal("Metadata registry is not attached to the request"))
    }
}
