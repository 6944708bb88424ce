//! Metadata records and the store they accumulate in
//!
//! Records are created lazily by the first declaration touching their key and
//! amended in place by every later one. At most one record exists per
//! (schema, property) and per (controller, handler).

pub mod property;
pub mod route;
pub mod stamp;
pub mod store;

pub use property::{
    ClassMetadata, ExcludeOptions, ExposeOptions, PropertyMetadata, SchemaId, TransformFn,
    TransformFns,
};
pub use route::{
    ControllerId, ControllerMetadata, HttpMethod, RouteDefinition, ValidationOptions,
    ValidationSpec,
};
pub use stamp::Seq;
pub use store::{MetadataStore, Registry};
