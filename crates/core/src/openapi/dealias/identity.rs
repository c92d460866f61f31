//! Identity bookkeeping for one de-aliasing pass.
//!
//! [`IdentityTracker`] lives for a whole pass and decides whether a node seen
//! at a new position is an alias that must be copied. [`CycleGuard`] lives for
//! one root traversal and stops the walker from descending twice into the
//! same node or around a cycle.

use std::collections::{HashMap, HashSet};

use crate::openapi::spec::SchemaId;

/// Pass-scoped record of every node identity already claimed by a position.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    seen: HashSet<SchemaId>,
    /// Clone -> the node it was (transitively) copied from.
    origins: HashMap<SchemaId, SchemaId>,
    clones: usize,
}

impl IdentityTracker {
    /// Create a tracker for a new pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// `false` on the first sighting of `id` (which is recorded), `true` on
    /// every later one. A later sighting means the position holds an alias.
    pub fn should_clone(&mut self, id: SchemaId) -> bool {
        !self.seen.insert(id)
    }

    /// Record a copy made of `original` (already seen), so the copy is never
    /// copied again when its subtree or a further alias reaches it.
    pub fn record_clone(&mut self, original: SchemaId, clone: SchemaId) -> SchemaId {
        self.seen.insert(clone);
        let origin = self.origin(original);
        self.origins.insert(clone, origin);
        self.clones += 1;
        clone
    }

    /// The node `id` was copied from during this pass, or `id` itself.
    pub fn origin(&self, id: SchemaId) -> SchemaId {
        self.origins.get(&id).copied().unwrap_or(id)
    }

    /// Number of copies made so far.
    pub fn clones(&self) -> usize {
        self.clones
    }
}

/// Per-root traversal state.
///
/// `visited` is never shrunk: a node entered once is not entered again for
/// the rest of this root, even along a different, acyclic path. `lineage` is
/// the active ancestor chain as `(origin, current)` pairs and is used to
/// recognise back edges.
#[derive(Debug, Default)]
pub struct CycleGuard {
    visited: HashSet<SchemaId>,
    lineage: Vec<(SchemaId, SchemaId)>,
}

impl CycleGuard {
    /// Fresh guard for one root entry point.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` (skip) if `id` was already entered during this root traversal,
    /// otherwise mark it and return `false`.
    pub fn enter(&mut self, id: SchemaId) -> bool {
        !self.visited.insert(id)
    }

    /// Push a node onto the active ancestor chain.
    pub fn push(&mut self, origin: SchemaId, current: SchemaId) {
        self.lineage.push((origin, current));
    }

    /// Pop the innermost ancestor.
    pub fn pop(&mut self) {
        self.lineage.pop();
    }

    /// If a node with this origin is an active ancestor, the node currently
    /// standing in for it.
    pub fn back_edge(&self, origin: SchemaId) -> Option<SchemaId> {
        self.lineage
            .iter()
            .rev()
            .find(|(o, _)| *o == origin)
            .map(|(_, current)| *current)
    }
}
