//! Axum adapter for dispatch entries
//!
//! Mounts every [`DispatchEntry`] on an `axum::Router`. Each request is turned
//! into [`RequestData`] (path params, query string, headers, JSON body), run
//! through the entry's chain and handler, and any [`PipelineError`] becomes
//! the JSON error body.

use super::composition::DispatchEntry;
use crate::core::error::PipelineError;
use crate::core::request::RequestData;
use crate::metadata::HttpMethod;
use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter, get};
use axum::{Json, Router};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

/// Route path in axum syntax
///
/// `:id` segments become `{id}`; the result always starts with `/`.
pub fn to_axum_path(path: &str) -> String {
    let path = path
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");

    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}

fn to_object(pairs: HashMap<String, String>) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<_, _>>(),
    )
}

fn parse_body(body: &Bytes) -> Result<Value, PipelineError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_slice(body)?)
}

async fn serve_entry(
    entry: Arc<DispatchEntry>,
    uri: Uri,
    headers: HeaderMap,
    params: Option<Path<HashMap<String, String>>>,
    query: HashMap<String, String>,
    body: Bytes,
) -> Response {
    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(err) => return err.into_response(),
    };

    let mut request = RequestData::new(entry.method, uri.path())
        .with_params(to_object(params.map(|Path(p)| p).unwrap_or_default()))
        .with_query(to_object(query))
        .with_body(body);
    request.headers = headers;

    match entry.dispatch(request).await {
        Ok(response) => response.into_response(),
        Err(err) => err.into_response(),
    }
}

fn mount(entry: Arc<DispatchEntry>, router: MethodRouter) -> MethodRouter {
    let filter = method_filter(entry.method);
    router.on(
        filter,
        move |uri: Uri,
              headers: HeaderMap,
              params: Option<Path<HashMap<String, String>>>,
              Query(query): Query<HashMap<String, String>>,
              body: Bytes| {
            let entry = entry.clone();
            async move { serve_entry(entry, uri, headers, params, query, body).await }
        },
    )
}

async fn endpoint_not_found(method: Method, uri: Uri) -> Response {
    tracing::debug!(%method, path = uri.path(), "no route matched");
    PipelineError::not_found(format!("Route {} not found", uri.path())).into_response()
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Build an axum router serving the entries
///
/// Entries sharing a path share one method router. A second entry for the
/// same method and path is ignored with a warning.
pub fn into_router(entries: Vec<DispatchEntry>) -> Router {
    let mut by_path: IndexMap<String, MethodRouter> = IndexMap::new();
    let mut seen: HashSet<(HttpMethod, String)> = HashSet::new();

    for entry in entries {
        let path = to_axum_path(&entry.full_path);
        if !seen.insert((entry.method, path.clone())) {
            tracing::warn!(
                method = %entry.method,
                path = %path,
                handler = %entry.handler_name,
                "duplicate route ignored"
            );
            continue;
        }
        let router = by_path.shift_remove(&path).unwrap_or_else(MethodRouter::new);
        by_path.insert(path, mount(Arc::new(entry), router));
    }

    let mut app = Router::new().route("/health", get(health_check));
    for (path, method_router) in by_path {
        app = app.route(&path, method_router);
    }

    app.fallback(endpoint_not_found)
        .layer(TraceLayer::new_for_http())
}
