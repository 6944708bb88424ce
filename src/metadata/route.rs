//! Controller and route metadata records

use super::property::SchemaId;
use super::stamp::{Seq, SeqList, Stamped, offer};
use crate::core::request::Location;
use crate::server::middleware::SharedMiddleware;
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP verbs a route can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Identifier of a controller type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(String);

impl ControllerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ControllerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Options of a body/query/params validation marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationOptions {
    /// Group filter applied while transforming the payload
    pub groups: Option<Vec<String>>,
    /// Skip validators of properties whose value is missing or null
    pub skip_missing_properties: bool,
    /// Only declared properties survive the transformation
    pub forbid_non_whitelisted: Option<bool>,
}

/// Reference to the schema a request slice is validated against
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSpec {
    pub schema: SchemaId,
    pub options: ValidationOptions,
}

/// Accumulated metadata of one (controller, handler) pair
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    handler_name: String,
    first_seq: Seq,
    verb: Option<Stamped<(HttpMethod, String)>>,
    middlewares: SeqList<SharedMiddleware>,
    body_validation: Option<Stamped<ValidationSpec>>,
    query_validation: Option<Stamped<ValidationSpec>>,
    params_validation: Option<Stamped<ValidationSpec>>,
}

impl RouteDefinition {
    /// A placeholder record with no verb and no validations
    pub fn new(handler_name: impl Into<String>) -> Self {
        Self {
            handler_name: handler_name.into(),
            first_seq: Seq::MAX,
            verb: None,
            middlewares: SeqList::default(),
            body_validation: None,
            query_validation: None,
            params_validation: None,
        }
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    /// Declared verb, or the placeholder default
    ///
    /// Without a verb marker a route answers `post` when it validates a body
    /// and `get` otherwise.
    pub fn method(&self) -> HttpMethod {
        match &self.verb {
            Some(stamped) => stamped.value.0,
            None if self.body_validation.is_some() => HttpMethod::Post,
            None => HttpMethod::Get,
        }
    }

    /// Route path relative to the controller base path
    pub fn path(&self) -> &str {
        self.verb.as_ref().map(|s| s.value.1.as_str()).unwrap_or("")
    }

    /// Whether a verb marker was applied
    pub fn has_verb(&self) -> bool {
        self.verb.is_some()
    }

    /// Method-scoped middlewares in declaration order
    pub fn middlewares(&self) -> impl Iterator<Item = &SharedMiddleware> {
        self.middlewares.iter()
    }

    pub fn validation(&self, location: Location) -> Option<&ValidationSpec> {
        let slot = match location {
            Location::Body => &self.body_validation,
            Location::Query => &self.query_validation,
            Location::Params => &self.params_validation,
        };
        slot.as_ref().map(|s| &s.value)
    }

    pub fn body_validation(&self) -> Option<&ValidationSpec> {
        self.validation(Location::Body)
    }

    pub fn query_validation(&self) -> Option<&ValidationSpec> {
        self.validation(Location::Query)
    }

    pub fn params_validation(&self) -> Option<&ValidationSpec> {
        self.validation(Location::Params)
    }

    pub(crate) fn first_seq(&self) -> Seq {
        self.first_seq
    }

    pub(crate) fn touch(&mut self, seq: Seq) {
        self.first_seq = self.first_seq.min(seq);
    }

    pub(crate) fn merge_verb(&mut self, seq: Seq, method: HttpMethod, path: String) {
        offer(&mut self.verb, seq, (method, path));
    }

    pub(crate) fn merge_middleware(&mut self, seq: Seq, middleware: SharedMiddleware) {
        self.middlewares.insert(seq, middleware);
    }

    pub(crate) fn merge_validation(&mut self, seq: Seq, location: Location, spec: ValidationSpec) {
        let slot = match location {
            Location::Body => &mut self.body_validation,
            Location::Query => &mut self.query_validation,
            Location::Params => &mut self.params_validation,
        };
        offer(slot, seq, spec);
    }
}

/// Accumulated metadata of one controller type
#[derive(Debug, Clone)]
pub struct ControllerMetadata {
    id: ControllerId,
    base_path: Option<Stamped<String>>,
    middlewares: SeqList<SharedMiddleware>,
    routes: Vec<RouteDefinition>,
}

impl ControllerMetadata {
    pub fn new(id: ControllerId) -> Self {
        Self {
            id,
            base_path: None,
            middlewares: SeqList::default(),
            routes: Vec::new(),
        }
    }

    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    pub fn base_path(&self) -> &str {
        self.base_path.as_ref().map(|s| s.value.as_str()).unwrap_or("")
    }

    /// Class-scoped middlewares in declaration order
    pub fn middlewares(&self) -> impl Iterator<Item = &SharedMiddleware> {
        self.middlewares.iter()
    }

    /// Routes in first-declaration order
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    pub fn route(&self, handler: &str) -> Option<&RouteDefinition> {
        self.routes.iter().find(|r| r.handler_name == handler)
    }

    /// Get or create the record of a handler; never creates a duplicate
    pub fn route_mut(&mut self, handler: &str) -> &mut RouteDefinition {
        match self.routes.iter().position(|r| r.handler_name == handler) {
            Some(index) => &mut self.routes[index],
            None => {
                self.routes.push(RouteDefinition::new(handler));
                let last = self.routes.len() - 1;
                &mut self.routes[last]
            }
        }
    }

    pub(crate) fn merge_base_path(&mut self, seq: Seq, path: String) {
        offer(&mut self.base_path, seq, path);
    }

    pub(crate) fn merge_middleware(&mut self, seq: Seq, middleware: SharedMiddleware) {
        self.middlewares.insert(seq, middleware);
    }

    pub(crate) fn sort_routes(&mut self) {
        self.routes.sort_by_key(|r| r.first_seq());
    }
}
