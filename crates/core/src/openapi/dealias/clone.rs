//! Shallow copies of schema nodes.

use crate::error::{Error, Result};
use crate::openapi::spec::{SchemaArena, SchemaId};

/// Copy the node `id` into a new arena slot and return the new identity.
///
/// The copy is shallow: child links still point at the original children,
/// which the walker deduplicates separately. Every keyword is carried over,
/// including ones foreign to the document's dialect, which the loader keeps
/// verbatim in [`Schema::extra`](crate::openapi::Schema::extra).
pub fn clone_node(arena: &mut SchemaArena, id: SchemaId) -> Result<SchemaId> {
    let copy = arena.get(id).ok_or(Error::DanglingSchema(id))?.clone();
    Ok(arena.insert(copy))
}
