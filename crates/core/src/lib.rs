//! Schema de-aliasing for parsed OpenAPI documents.
//!
//! Loaders that memoize identical fragments leave one schema node shared by
//! many positions of the document. [`openapi::dealias()`] splits those shared
//! nodes so that every position can be edited independently, while `$ref`
//! sharing of named components stays as it is.

pub mod error;
pub mod openapi;

pub use error::{Error, Result};
