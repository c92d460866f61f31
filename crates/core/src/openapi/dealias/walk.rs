//! Depth-first schema walker with copy-on-alias.

use std::collections::BTreeMap;

use tracing::trace;

use super::classify::{NodeKind, classify};
use super::clone::clone_node;
use super::identity::{CycleGuard, IdentityTracker};
use crate::error::{Error, Result};
use crate::openapi::spec::{AdditionalProperties, Member, Schema, SchemaArena, SchemaId};

/// Composition keywords, in the order the generic handler runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    AllOf,
    OneOf,
    AnyOf,
}

impl Keyword {
    fn name(self) -> &'static str {
        match self {
            Self::AllOf => "allOf",
            Self::OneOf => "oneOf",
            Self::AnyOf => "anyOf",
        }
    }

    fn members(self, schema: &Schema) -> Option<&Vec<Member>> {
        match self {
            Self::AllOf => schema.all_of.as_ref(),
            Self::OneOf => schema.one_of.as_ref(),
            Self::AnyOf => schema.any_of.as_ref(),
        }
    }

    fn members_mut(self, schema: &mut Schema) -> Option<&mut Vec<Member>> {
        match self {
            Self::AllOf => schema.all_of.as_mut(),
            Self::OneOf => schema.one_of.as_mut(),
            Self::AnyOf => schema.any_of.as_mut(),
        }
    }
}

/// A parent-to-child link inside a schema node.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Link {
    Items,
    MapValues,
    Member(Keyword, usize),
    Property(String),
}

/// A node on the walk stack and the links still to follow.
#[derive(Debug)]
struct Frame {
    id: SchemaId,
    links: Vec<Link>,
    next: usize,
}

/// Links to follow out of `node`, in walk order.
fn links(node: &Schema) -> Vec<Link> {
    let mut links = Vec::new();
    match classify(node) {
        NodeKind::Array => links.push(Link::Items),
        NodeKind::Map => links.push(Link::MapValues),
        NodeKind::OneOf => member_links(node, Keyword::OneOf, &mut links),
        NodeKind::AnyOf => member_links(node, Keyword::AnyOf, &mut links),
        NodeKind::AllOfWithFields => {
            property_links(node, &mut links);
            member_links(node, Keyword::AllOf, &mut links);
        }
        NodeKind::AllOf => member_links(node, Keyword::AllOf, &mut links),
        // Every applicable handler fires, not just the first.
        NodeKind::ComposedGeneric => {
            for keyword in [Keyword::AllOf, Keyword::OneOf, Keyword::AnyOf] {
                member_links(node, keyword, &mut links);
            }
            property_links(node, &mut links);
            if node.map_values().is_some() {
                links.push(Link::MapValues);
            }
        }
        NodeKind::PlainWithFields => property_links(node, &mut links),
        NodeKind::Leaf => {}
    }
    links
}

fn member_links(node: &Schema, keyword: Keyword, links: &mut Vec<Link>) {
    let len = keyword.members(node).map_or(0, Vec::len);
    links.extend((0..len).map(|index| Link::Member(keyword, index)));
}

fn property_links(node: &Schema, links: &mut Vec<Link>) {
    links.extend(
        node.properties
            .iter()
            .flat_map(BTreeMap::keys)
            .cloned()
            .map(Link::Property),
    );
}

/// Walks schema subtrees, giving every structural position its own node.
///
/// One walker serves a whole pass: its [`IdentityTracker`] is shared by every
/// root, while each root gets a fresh [`CycleGuard`].
#[derive(Debug)]
pub struct Walker<'a> {
    arena: &'a mut SchemaArena,
    tracker: IdentityTracker,
    roots: usize,
}

impl<'a> Walker<'a> {
    /// Walker over `arena`.
    pub fn new(arena: &'a mut SchemaArena) -> Self {
        Self {
            arena,
            tracker: IdentityTracker::new(),
            roots: 0,
        }
    }

    /// Root entry points walked so far.
    pub fn roots(&self) -> usize {
        self.roots
    }

    /// Copies made so far.
    pub fn clones(&self) -> usize {
        self.tracker.clones()
    }

    /// Deduplicate the schema held by a root slot, then walk its subtree with
    /// a fresh cycle guard.
    pub fn walk_root(&mut self, slot: &mut SchemaId) -> Result<()> {
        self.roots += 1;
        *slot = self.claim(*slot)?;
        let mut guard = CycleGuard::new();
        self.walk(*slot, &mut guard)
    }

    /// [`Walker::walk_root`] for an optional slot; a null schema is a no-op.
    pub fn walk_optional_root(&mut self, slot: Option<&mut SchemaId>) -> Result<()> {
        match slot {
            Some(slot) => self.walk_root(slot),
            None => Ok(()),
        }
    }

    /// Keep `id` on first sighting, otherwise hand back a fresh copy.
    fn claim(&mut self, id: SchemaId) -> Result<SchemaId> {
        if !self.tracker.should_clone(id) {
            return Ok(id);
        }
        let copy = clone_node(self.arena, id)?;
        trace!(original = %id, copy = %copy, "Cloned aliased schema.");
        Ok(self.tracker.record_clone(id, copy))
    }

    fn node(&self, id: SchemaId) -> Result<&Schema> {
        self.arena.get(id).ok_or(Error::DanglingSchema(id))
    }

    fn node_mut(&mut self, id: SchemaId) -> Result<&mut Schema> {
        self.arena.get_mut(id).ok_or(Error::DanglingSchema(id))
    }

    /// Depth-first walk from `root` on an explicit stack, so nesting depth is
    /// bounded by memory rather than the call stack.
    fn walk(&mut self, root: SchemaId, guard: &mut CycleGuard) -> Result<()> {
        let mut stack: Vec<Frame> = self.enter(root, guard)?.into_iter().collect();
        while let Some(frame) = stack.last_mut() {
            let Some(link) = frame.links.get(frame.next).cloned() else {
                stack.pop();
                guard.pop();
                continue;
            };
            frame.next += 1;
            let parent = frame.id;

            if let Some(child) = self.descend(parent, &link, guard)? {
                stack.extend(self.enter(child, guard)?);
            }
        }
        Ok(())
    }

    /// Open a frame for `id` unless this root already entered it.
    fn enter(&mut self, id: SchemaId, guard: &mut CycleGuard) -> Result<Option<Frame>> {
        if guard.enter(id) {
            return Ok(None);
        }
        let links = links(self.node(id)?);
        guard.push(self.tracker.origin(id), id);
        Ok(Some(Frame { id, links, next: 0 }))
    }

    /// Deduplicate the child behind `link` and rewrite the link if a copy was
    /// made. Returns the child still to be walked.
    fn descend(
        &mut self,
        parent: SchemaId,
        link: &Link,
        guard: &CycleGuard,
    ) -> Result<Option<SchemaId>> {
        let Some(child) = self.child(parent, link)? else {
            return Ok(None);
        };

        // Back edge: keep the cycle closed on the ancestor's current node.
        if let Some(current) = guard.back_edge(self.tracker.origin(child)) {
            if current != child {
                self.relink(parent, link, current)?;
            }
            return Ok(None);
        }

        let claimed = self.claim(child)?;
        if claimed != child {
            self.relink(parent, link, claimed)?;
        }
        Ok(Some(claimed))
    }

    fn child(&self, parent: SchemaId, link: &Link) -> Result<Option<SchemaId>> {
        let node = self.node(parent)?;
        let child = match link {
            Link::Items => node.items,
            Link::MapValues => node.map_values(),
            Link::Member(keyword, index) => match keyword.members(node).and_then(|m| m.get(*index)) {
                Some(Member::Schema(id)) => Some(*id),
                Some(Member::Null) | None => None,
                Some(Member::Invalid(value)) => {
                    return Err(Error::MalformedComposition {
                        keyword: keyword.name(),
                        node: parent,
                        index: *index,
                        value: value.to_string(),
                    });
                }
            },
            Link::Property(name) => node
                .properties
                .as_ref()
                .and_then(|props| props.get(name))
                .copied()
                .flatten(),
        };
        Ok(child)
    }

    fn relink(&mut self, parent: SchemaId, link: &Link, child: SchemaId) -> Result<()> {
        let node = self.node_mut(parent)?;
        match link {
            Link::Items => node.items = Some(child),
            Link::MapValues => node.additional_properties = Some(AdditionalProperties::Schema(child)),
            Link::Member(keyword, index) => {
                if let Some(slot) = keyword.members_mut(node).and_then(|m| m.get_mut(*index)) {
                    *slot = Member::Schema(child);
                }
            }
            Link::Property(name) => {
                if let Some(slot) = node.properties.as_mut().and_then(|props| props.get_mut(name)) {
                    *slot = Some(child);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::openapi::spec::SchemaType;
    use serde_json::json;

    fn typed(arena: &mut SchemaArena, ty: &str) -> SchemaId {
        arena.insert(Schema {
            schema_type: Some(SchemaType::Single(ty.into())),
            ..Schema::default()
        })
    }

    fn object(arena: &mut SchemaArena, props: &[(&str, SchemaId)]) -> SchemaId {
        arena.insert(Schema {
            schema_type: Some(SchemaType::Single("object".into())),
            properties: Some(
                props
                    .iter()
                    .map(|(name, id)| ((*name).to_string(), Some(*id)))
                    .collect(),
            ),
            ..Schema::default()
        })
    }

    fn prop(arena: &SchemaArena, id: SchemaId, name: &str) -> SchemaId {
        arena.get(id).unwrap().properties.as_ref().unwrap()[name].unwrap()
    }

    #[test]
    fn test_shared_property_is_split() {
        let mut arena = SchemaArena::new();
        let name = typed(&mut arena, "string");
        let mut root = object(&mut arena, &[("first", name), ("last", name)]);

        let mut walker = Walker::new(&mut arena);
        walker.walk_root(&mut root).unwrap();
        assert_eq!(walker.clones(), 1);

        let first = prop(&arena, root, "first");
        let last = prop(&arena, root, "last");
        assert_ne!(first, last);
        assert_eq!(arena.get(first), arena.get(last));

        arena.get_mut(first).unwrap().description = Some("given name".into());
        assert_eq!(arena.get(last).unwrap().description, None);
    }

    #[test]
    fn test_shared_subtree_is_split_below_the_copy() {
        let mut arena = SchemaArena::new();
        let id = typed(&mut arena, "string");
        let address = object(&mut arena, &[("id", id)]);
        let mut root = object(&mut arena, &[("home", address), ("work", address)]);

        let mut walker = Walker::new(&mut arena);
        walker.walk_root(&mut root).unwrap();

        let home = prop(&arena, root, "home");
        let work = prop(&arena, root, "work");
        assert_ne!(home, work);
        assert_ne!(prop(&arena, home, "id"), prop(&arena, work, "id"));
    }

    #[test]
    fn test_self_referencing_items_terminates() {
        let mut arena = SchemaArena::new();
        let mut list = arena.insert(Schema::default());
        arena.get_mut(list).unwrap().items = Some(list);

        let mut walker = Walker::new(&mut arena);
        walker.walk_root(&mut list).unwrap();
        assert_eq!(walker.clones(), 0);
        assert_eq!(arena.get(list).unwrap().items, Some(list));
    }

    #[test]
    fn test_cycle_reached_through_alias_closes_on_copy() {
        let mut arena = SchemaArena::new();
        let node = arena.insert(Schema::default());
        arena.get_mut(node).unwrap().items = Some(node);
        let mut first = node;
        let mut second = node;

        let mut walker = Walker::new(&mut arena);
        walker.walk_root(&mut first).unwrap();
        walker.walk_root(&mut second).unwrap();

        assert_eq!(first, node);
        assert_ne!(second, node);
        assert_eq!(arena.get(first).unwrap().items, Some(first));
        assert_eq!(arena.get(second).unwrap().items, Some(second));
    }

    #[test]
    fn test_array_ignores_additional_properties() {
        let mut arena = SchemaArena::new();
        let item = typed(&mut arena, "string");
        let values = typed(&mut arena, "integer");
        let mut root = arena.insert(Schema {
            items: Some(item),
            additional_properties: Some(AdditionalProperties::Schema(values)),
            ..Schema::default()
        });

        let mut walker = Walker::new(&mut arena);
        walker.walk_root(&mut root).unwrap();
        let mut again = values;
        walker.walk_root(&mut again).unwrap();

        // `values` was never claimed under the array, so the later root keeps it.
        assert_eq!(again, values);
        assert_eq!(
            arena.get(root).unwrap().additional_properties,
            Some(AdditionalProperties::Schema(values))
        );
    }

    #[test]
    fn test_null_members_are_skipped() {
        let mut arena = SchemaArena::new();
        let text = typed(&mut arena, "string");
        let mut root = arena.insert(Schema {
            one_of: Some(vec![Member::Null, Member::Schema(text), Member::Schema(text)]),
            ..Schema::default()
        });

        let mut walker = Walker::new(&mut arena);
        walker.walk_root(&mut root).unwrap();

        let members = arena.get(root).unwrap().one_of.clone().unwrap();
        assert_eq!(members[0], Member::Null);
        assert_eq!(members[1], Member::Schema(text));
        assert_ne!(members[2], Member::Schema(text));
    }

    #[test]
    fn test_invalid_member_is_fatal() {
        let mut arena = SchemaArena::new();
        let mut root = arena.insert(Schema {
            any_of: Some(vec![Member::Invalid(json!("not a schema"))]),
            ..Schema::default()
        });

        let mut walker = Walker::new(&mut arena);
        let err = walker.walk_root(&mut root).unwrap_err();
        assert!(matches!(
            &err,
            Error::MalformedComposition { keyword: "anyOf", node, index: 0, value }
                if *node == root && value == "\"not a schema\""
        ));
        let expected = format!(
            "Error! anyOf schema at index 0 of node {root} is not of the type Schema: \"not a schema\""
        );
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_all_of_with_fields_walks_both() {
        let mut arena = SchemaArena::new();
        let shared = typed(&mut arena, "string");
        let mut root = arena.insert(Schema {
            all_of: Some(vec![Member::Schema(shared)]),
            properties: Some(BTreeMap::from([("tag".to_string(), Some(shared))])),
            ..Schema::default()
        });

        let mut walker = Walker::new(&mut arena);
        walker.walk_root(&mut root).unwrap();

        // Properties run first and keep the original; allOf receives the copy.
        let node = arena.get(root).unwrap();
        assert_eq!(node.properties.as_ref().unwrap()["tag"], Some(shared));
        assert_ne!(node.all_of.as_ref().unwrap()[0], Member::Schema(shared));
    }

    #[test]
    fn test_map_values_are_split() {
        let mut arena = SchemaArena::new();
        let value = typed(&mut arena, "integer");
        let mut left = arena.insert(Schema {
            additional_properties: Some(AdditionalProperties::Schema(value)),
            ..Schema::default()
        });
        let mut right = arena.insert(Schema {
            additional_properties: Some(AdditionalProperties::Schema(value)),
            ..Schema::default()
        });

        let mut walker = Walker::new(&mut arena);
        walker.walk_root(&mut left).unwrap();
        walker.walk_root(&mut right).unwrap();
        assert_eq!(walker.roots(), 2);

        assert_ne!(
            arena.get(left).unwrap().map_values(),
            arena.get(right).unwrap().map_values()
        );
    }

    #[test]
    fn test_deep_nesting_runs_on_a_small_stack() {
        let clones = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let mut arena = SchemaArena::new();
                let leaf = typed(&mut arena, "string");
                let mut root = object(&mut arena, &[("a", leaf), ("b", leaf)]);
                for _ in 0..10_000 {
                    root = arena.insert(Schema {
                        items: Some(root),
                        ..Schema::default()
                    });
                }

                let mut walker = Walker::new(&mut arena);
                walker.walk_root(&mut root).unwrap();
                walker.clones()
            })
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(clones, 1);
    }
}
