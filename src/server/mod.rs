//! Server module: middleware chains, handler binding, route composition and
//! the axum dispatcher adapter
//!
//! - [`composition`] turns frozen controller metadata into dispatch entries
//! - [`router`] mounts dispatch entries on an `axum::Router`
//! - [`ServerBuilder`] wires declarations, configuration and controllers together

pub mod builder;
pub mod composition;
pub mod handler;
pub mod middleware;
pub mod router;

pub use builder::ServerBuilder;
pub use composition::{DispatchEntry, RegisterRoutesOptions, compose_routes, register_controller};
pub use handler::{Handler, bind, handler_fn};
pub use middleware::{
    Middleware, SharedMiddleware, ValidationMiddleware, create_validation_middleware,
    middleware_fn, run_chain,
};
pub use router::into_router;
