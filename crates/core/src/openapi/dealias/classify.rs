//! Structural classification of schema nodes.
//!
//! A schema carries no explicit shape tag; its shape is read from which
//! structural keywords are populated. The checks run in a fixed priority order
//! and the first match wins, so e.g. a node with both `items` and a schema
//! valued `additionalProperties` is an [`NodeKind::Array`] only.

use crate::openapi::spec::Schema;

/// Traversal rule selected for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `items` is set.
    Array,
    /// `additionalProperties` is a schema.
    Map,
    /// Non-empty `oneOf`.
    OneOf,
    /// Non-empty `anyOf`.
    AnyOf,
    /// Non-empty `allOf` next to non-empty `properties`.
    AllOfWithFields,
    /// Non-empty `allOf`.
    AllOf,
    /// A composition keyword is present but none of the above matched.
    ComposedGeneric,
    /// Non-empty `properties` on a non-composed node.
    PlainWithFields,
    /// No structural children.
    Leaf,
}

/// Classify `schema`, testing shapes in priority order.
pub fn classify(schema: &Schema) -> NodeKind {
    if schema.is_array() {
        NodeKind::Array
    } else if schema.map_values().is_some() {
        NodeKind::Map
    } else if schema.is_one_of() {
        NodeKind::OneOf
    } else if schema.is_any_of() {
        NodeKind::AnyOf
    } else if schema.is_all_of() && schema.has_properties() {
        NodeKind::AllOfWithFields
    } else if schema.is_all_of() {
        NodeKind::AllOf
    } else if schema.is_composed() {
        NodeKind::ComposedGeneric
    } else if schema.has_properties() {
        NodeKind::PlainWithFields
    } else {
        NodeKind::Leaf
    }
}
