//! Error types for loading, de-aliasing and emitting documents.

use thiserror::Error;

/// Result type for dealias operations
pub type Result<T> = std::result::Result<T, Error>;

/// Dealias errors
#[derive(Error, Debug)]
pub enum Error {
    /// A composition list holds something that is neither a schema nor null.
    #[error(
        "Error! {keyword} schema at index {index} of node {node} is not of the type Schema: {value}"
    )]
    MalformedComposition {
        /// `allOf`, `oneOf` or `anyOf`.
        keyword: &'static str,
        /// Arena node holding the composition list.
        node: crate::openapi::SchemaId,
        /// Position of the offending entry in the list.
        index: usize,
        /// The offending value, as JSON.
        value: String,
    },

    /// The document's `openapi` field is missing.
    #[error("Missing `openapi` version field")]
    MissingVersion,

    /// The document's `openapi` version is not 3.0.x or 3.1.x.
    #[error("Unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),

    /// A value has the wrong JSON shape for its position.
    #[error("Invalid document at {pointer}: expected {expected}")]
    InvalidShape {
        /// Location of the offending value.
        pointer: String,
        /// What the position should hold.
        expected: &'static str,
    },

    /// A cyclic schema graph cannot be written out as a JSON tree.
    #[error("Cyclic schema at {pointer} cannot be emitted")]
    CyclicSchema {
        /// Location where the cycle closes.
        pointer: String,
    },

    /// A schema id that does not belong to the document's arena.
    #[error("Dangling schema id {0}")]
    DanglingSchema(crate::openapi::SchemaId),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
