//! Declarative markers as data
//!
//! Each marker is an [`Annotation`] value: a target plus the fields it wants
//! to write. Markers are collected in declaration order by [`SchemaDecl`] and
//! [`ControllerDecl`], each stamped with a declaration sequence number, and
//! merged into the [`MetadataStore`](crate::metadata::MetadataStore) by an
//! explicit pass whose result does not depend on application order.
//!
//! ```rust,ignore
//! impl Schema for LoginRequest {
//!     const NAME: &'static str = "LoginRequest";
//!
//!     fn declare(decl: &mut SchemaDecl) {
//!         decl.exclude_extraneous_values();
//!         decl.property("email").expose().required().is_email();
//!         decl.property("password").expose().required().is_string();
//!     }
//! }
//! ```

pub mod controller;
pub mod schema;

pub use controller::{Controller, ControllerDecl, RouteDecl};
pub use schema::{PropertyDecl, Schema, SchemaDecl};

use crate::core::request::Location;
use crate::metadata::{
    ControllerId, ExcludeOptions, ExposeOptions, HttpMethod, SchemaId, Seq, TransformFns,
    ValidationSpec,
};
use crate::server::middleware::SharedMiddleware;
use crate::validation::Validator;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Next declaration sequence number, unique for the process
pub(crate) fn next_seq() -> Seq {
    NEXT_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Class-level schema markers
#[derive(Debug, Clone)]
pub enum SchemaMarker {
    ExcludeExtraneousValues,
}

/// Property-level markers
#[derive(Debug, Clone)]
pub enum PropertyMarker {
    Expose(ExposeOptions),
    Exclude(ExcludeOptions),
    /// Nested schema used when converting the property
    Type(SchemaId),
    Transform(TransformFns),
    DefaultValue(Value),
    Validate(Validator),
}

/// Class-level controller markers
#[derive(Debug, Clone)]
pub enum ControllerMarker {
    BasePath(String),
    UseMiddleware(SharedMiddleware),
}

/// Method-level route markers
#[derive(Debug, Clone)]
pub enum RouteMarker {
    Verb { method: HttpMethod, path: String },
    UseMiddleware(SharedMiddleware),
    Validate { location: Location, spec: ValidationSpec },
}

/// A marker together with its target
#[derive(Debug, Clone)]
pub enum Annotation {
    Schema {
        schema: SchemaId,
        marker: SchemaMarker,
    },
    Property {
        schema: SchemaId,
        property: String,
        marker: PropertyMarker,
    },
    Controller {
        controller: ControllerId,
        marker: ControllerMarker,
    },
    Route {
        controller: ControllerId,
        handler: String,
        marker: RouteMarker,
    },
}

/// An annotation stamped with its declaration sequence
#[derive(Debug, Clone)]
pub struct Declared {
    pub seq: Seq,
    pub annotation: Annotation,
}

/// Ordered list of declarations
#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    items: Vec<Declared>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration, returning the sequence it was stamped with
    pub fn push(&mut self, annotation: Annotation) -> Seq {
        let seq = next_seq();
        self.items.push(Declared { seq, annotation });
        seq
    }

    pub fn extend(&mut self, other: AnnotationSet) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declared> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for AnnotationSet {
    type Item = Declared;
    type IntoIter = std::vec::IntoIter<Declared>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl From<Vec<Declared>> for AnnotationSet {
    fn from(items: Vec<Declared>) -> Self {
        Self { items }
    }
}
