//! Core module containing the data types shared by every pipeline stage

pub mod error;
pub mod field;
pub mod request;
pub mod response;

pub use error::{ConfigError, Direction, ErrorResponse, PipelineError, RequestError, TransformError};
pub use field::{FieldValue, Instance};
pub use request::{Location, RequestData};
pub use response::{
    HandlerResponse, HandlerResult, PaginationMeta, ResponseEnvelope, ResponseTransformer, Shaped,
};
