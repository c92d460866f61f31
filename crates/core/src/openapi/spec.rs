//! OpenAPI document model.
//!
//! This module defines the subset of the OpenAPI 3.0/3.1 document that the
//! de-aliasing pass walks. Schema nodes live in a [`SchemaArena`] and every
//! structural link between them is a [`SchemaId`], so two document positions
//! holding the same id share one node. Keys we do not model are kept verbatim
//! in the `extra` map of the owning struct.

use std::collections::BTreeMap;

use serde_json::Value;

/// Unmodelled keys, preserved as raw JSON.
pub type Extra = BTreeMap<String, Value>;

/// OpenAPI dialect of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// OpenAPI 3.0.x: nullability is the `nullable` keyword.
    #[default]
    V30,
    /// OpenAPI 3.1.x: nullability is a `type` list containing `"null"`.
    V31,
}

impl Dialect {
    /// Detect the dialect from the document's `openapi` version string.
    pub fn from_version(version: &str) -> Option<Self> {
        let mut parts = version.trim().split('.');
        match (parts.next(), parts.next()) {
            (Some("3"), Some("0")) => Some(Self::V30),
            (Some("3"), Some("1")) => Some(Self::V31),
            _ => None,
        }
    }
}

/// Provenance identity of a schema node: its slot in the [`SchemaArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

impl SchemaId {
    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only storage for schema nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaArena {
    nodes: Vec<Schema>,
}

impl SchemaArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node and return its fresh identity.
    pub fn insert(&mut self, schema: Schema) -> SchemaId {
        self.nodes.push(schema);
        SchemaId(self.nodes.len() - 1)
    }

    /// Borrow a node. Ids are only minted by this arena, so lookups succeed
    /// for any id obtained from it.
    pub fn get(&self, id: SchemaId) -> Option<&Schema> {
        self.nodes.get(id.0)
    }

    /// Mutably borrow a node.
    pub fn get_mut(&mut self, id: SchemaId) -> Option<&mut Schema> {
        self.nodes.get_mut(id.0)
    }

    /// Number of nodes ever allocated.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node was ever allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Root OpenAPI document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Version string as written in the `openapi` field.
    pub openapi: String,
    /// Dialect derived from [`Document::openapi`].
    pub dialect: Dialect,
    /// Path templates to path items.
    pub paths: BTreeMap<String, PathItem>,
    /// Reusable components.
    pub components: Option<Components>,
    /// Storage for every schema node reachable from this document.
    pub schemas: SchemaArena,
    /// Unmodelled top-level keys (`info`, `servers`, `tags`, ...).
    pub extra: Extra,
}

/// Components section containing reusable definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Components {
    /// Named schemas. A `None` value is an entry whose definition is absent.
    pub schemas: BTreeMap<String, Option<SchemaId>>,
    /// Named responses.
    pub responses: BTreeMap<String, ApiResponse>,
    /// Named request bodies.
    pub request_bodies: BTreeMap<String, RequestBody>,
    /// Named parameters.
    pub parameters: BTreeMap<String, Parameter>,
    /// Named headers.
    pub headers: BTreeMap<String, Header>,
    /// Unmodelled component sections (`securitySchemes`, `examples`, ...).
    pub extra: Extra,
}

/// HTTP methods an OpenAPI path item can hold, in document order.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A path item containing operations for different HTTP methods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathItem {
    /// Operations keyed by lowercase HTTP method.
    pub operations: BTreeMap<String, Operation>,
    /// Path-level parameters shared by all operations.
    pub parameters: Option<Vec<Parameter>>,
    /// Unmodelled keys (`summary`, `servers`, ...).
    pub extra: Extra,
}

impl PathItem {
    /// Operations in [`HTTP_METHODS`] order.
    pub fn operations_mut(&mut self) -> impl Iterator<Item = &mut Operation> {
        let mut ops: Vec<_> = self.operations.iter_mut().collect();
        ops.sort_by_key(|(method, _)| method_rank(method));
        ops.into_iter().map(|(_, op)| op)
    }
}

fn method_rank(method: &str) -> usize {
    HTTP_METHODS
        .iter()
        .position(|m| *m == method)
        .unwrap_or(HTTP_METHODS.len())
}

/// An API operation (endpoint).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    /// Operation parameters.
    pub parameters: Option<Vec<Parameter>>,
    /// Request body, inline or by reference.
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code.
    pub responses: Option<BTreeMap<String, ApiResponse>>,
    /// Callbacks: name -> runtime expression -> path item.
    pub callbacks: Option<BTreeMap<String, BTreeMap<String, PathItem>>>,
    /// Unmodelled keys (`operationId`, `summary`, `tags`, ...).
    pub extra: Extra,
}

/// A parameter (query, path, header or cookie), inline or by reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameter {
    /// `$ref` to a component parameter.
    pub ref_path: Option<String>,
    /// Parameter schema.
    pub schema: Option<SchemaId>,
    /// Media-type keyed content, the alternative to `schema`.
    pub content: Option<BTreeMap<String, MediaType>>,
    /// Unmodelled keys (`name`, `in`, `required`, ...).
    pub extra: Extra,
}

/// A request body definition, inline or by reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBody {
    /// `$ref` to a component request body.
    pub ref_path: Option<String>,
    /// Media-type keyed content.
    pub content: Option<BTreeMap<String, MediaType>>,
    /// Unmodelled keys (`description`, `required`, ...).
    pub extra: Extra,
}

/// A response definition, inline or by reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    /// `$ref` to a component response.
    pub ref_path: Option<String>,
    /// Media-type keyed content.
    pub content: Option<BTreeMap<String, MediaType>>,
    /// Response headers.
    pub headers: Option<BTreeMap<String, Header>>,
    /// Unmodelled keys (`description`, `links`, ...).
    pub extra: Extra,
}

/// A response header, inline or by reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    /// `$ref` to a component header.
    pub ref_path: Option<String>,
    /// Header schema.
    pub schema: Option<SchemaId>,
    /// Unmodelled keys.
    pub extra: Extra,
}

/// Media type content (e.g., application/json).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaType {
    /// Payload schema.
    pub schema: Option<SchemaId>,
    /// Unmodelled keys (`example`, `encoding`, ...).
    pub extra: Extra,
}

/// Schema type can be a single type or an array of types (3.1 nullability).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaType {
    /// `"type": "string"`
    Single(String),
    /// `"type": ["string", "null"]`
    Multiple(Vec<String>),
}

/// Additional properties can be a boolean or a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalProperties {
    /// `additionalProperties: true|false`
    Bool(bool),
    /// `additionalProperties: {...}`
    Schema(SchemaId),
}

/// One entry of an `allOf`/`oneOf`/`anyOf` list.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// A schema node.
    Schema(SchemaId),
    /// An explicit `null` entry.
    Null,
    /// Anything else; a structurally invalid document.
    Invalid(Value),
}

impl Member {
    /// The schema id, if this entry is a schema.
    pub fn schema(&self) -> Option<SchemaId> {
        match self {
            Self::Schema(id) => Some(*id),
            Self::Null | Self::Invalid(_) => None,
        }
    }
}

/// JSON Schema definition used in OpenAPI.
///
/// Structural children are ids into the owning document's arena.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// The type of the schema (string, number, integer, boolean, object, array).
    pub schema_type: Option<SchemaType>,

    /// Reference to another schema. Never chased by the de-aliasing pass.
    pub ref_path: Option<String>,

    /// Human readable title.
    pub title: Option<String>,

    /// Human readable description.
    pub description: Option<String>,

    /// Format hint (e.g., date-time, uuid).
    pub format: Option<String>,

    /// Properties for object types. A `None` value is a null property schema.
    pub properties: Option<BTreeMap<String, Option<SchemaId>>>,

    /// Required property names for object types.
    pub required: Option<Vec<String>>,

    /// Item schema for array types.
    pub items: Option<SchemaId>,

    /// Additional properties for object types (for Record/dict types).
    pub additional_properties: Option<AdditionalProperties>,

    /// Union type (exactly one of these schemas).
    pub one_of: Option<Vec<Member>>,

    /// Union type (any of these schemas).
    pub any_of: Option<Vec<Member>>,

    /// Intersection type (all of these schemas combined).
    pub all_of: Option<Vec<Member>>,

    /// Enum values.
    pub enum_values: Option<Vec<Value>>,

    /// Default value for the schema.
    pub default: Option<Value>,

    /// OpenAPI 3.0 nullable flag (3.1 uses type arrays instead). A 3.1
    /// document's `nullable` is kept in `extra`.
    pub nullable: Option<bool>,

    /// OpenAPI 3.1 constant value. In 3.0 documents `const` and `examples`
    /// are kept in `extra`.
    pub const_value: Option<Value>,

    /// OpenAPI 3.1 example list.
    pub examples: Option<Vec<Value>>,

    /// Every other keyword, verbatim.
    pub extra: Extra,
}

fn non_empty<T>(list: Option<&Vec<T>>) -> bool {
    list.is_some_and(|l| !l.is_empty())
}

impl Schema {
    /// Array shape: has an `items` child.
    pub fn is_array(&self) -> bool {
        self.items.is_some()
    }

    /// Map shape: `additionalProperties` holds a schema rather than a flag.
    pub fn map_values(&self) -> Option<SchemaId> {
        match self.additional_properties {
            Some(AdditionalProperties::Schema(id)) => Some(id),
            Some(AdditionalProperties::Bool(_)) | None => None,
        }
    }

    /// Non-empty `oneOf`.
    pub fn is_one_of(&self) -> bool {
        non_empty(self.one_of.as_ref())
    }

    /// Non-empty `anyOf`.
    pub fn is_any_of(&self) -> bool {
        non_empty(self.any_of.as_ref())
    }

    /// Non-empty `allOf`.
    pub fn is_all_of(&self) -> bool {
        non_empty(self.all_of.as_ref())
    }

    /// Non-empty `properties`.
    pub fn has_properties(&self) -> bool {
        self.properties.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Composition keyword present, even with an empty list.
    pub fn is_composed(&self) -> bool {
        self.all_of.is_some() || self.one_of.is_some() || self.any_of.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_version() {
        assert_eq!(Dialect::from_version("3.0.3"), Some(Dialect::V30));
        assert_eq!(Dialect::from_version("3.1.0"), Some(Dialect::V31));
        assert_eq!(Dialect::from_version(" 3.1.1 "), Some(Dialect::V31));
        assert_eq!(Dialect::from_version("2.0"), None);
        assert_eq!(Dialect::from_version("3"), None);
    }

    #[test]
    fn test_arena_ids_are_distinct_allocations() {
        let mut arena = SchemaArena::new();
        let a = arena.insert(Schema::default());
        let b = arena.insert(Schema::default());
        assert_ne!(a, b);
        assert_eq!(arena.get(a), arena.get(b));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_map_values_ignores_boolean_flag() {
        let mut arena = SchemaArena::new();
        let inner = arena.insert(Schema::default());
        let map = Schema {
            additional_properties: Some(AdditionalProperties::Schema(inner)),
            ..Schema::default()
        };
        let open = Schema {
            additional_properties: Some(AdditionalProperties::Bool(true)),
            ..Schema::default()
        };
        assert_eq!(map.map_values(), Some(inner));
        assert_eq!(open.map_values(), None);
    }

    #[test]
    fn test_composed_counts_empty_lists() {
        let schema = Schema {
            all_of: Some(Vec::new()),
            ..Schema::default()
        };
        assert!(schema.is_composed());
        assert!(!schema.is_all_of());
    }

    #[test]
    fn test_operations_in_method_order() {
        let mut item = PathItem::default();
        for method in ["trace", "post", "get"] {
            let mut op = Operation::default();
            op.extra
                .insert("operationId".into(), Value::String(method.into()));
            item.operations.insert(method.into(), op);
        }
        let order: Vec<_> = item
            .operations_mut()
            .map(|op| op.extra["operationId"].clone())
            .collect();
        assert_eq!(order, vec!["get", "post", "trace"]);
    }
}
