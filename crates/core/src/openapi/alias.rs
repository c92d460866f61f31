//! Read-only detection of structural schema aliasing.
//!
//! Lists every schema node that sits at more than one structural position.
//! Each node is expanded once; links back to an ancestor on the current path
//! are cycles, not aliases, and are not counted. Named components are scanned
//! from their own tables, so `$ref` sharing never shows up here.

use std::collections::{BTreeMap, HashSet};

use super::loader::child_pointer;
use super::spec::{
    AdditionalProperties, ApiResponse, Document, MediaType, Operation, Parameter, PathItem,
    SchemaArena, SchemaId,
};

/// Nodes found at more than one position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasReport {
    /// Shared node -> JSON pointers of every position holding it.
    pub aliases: BTreeMap<SchemaId, Vec<String>>,
    /// Positions visited.
    pub positions: usize,
}

impl AliasReport {
    /// True when no node is shared.
    pub fn is_clean(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Scan `document` for schema nodes shared between positions.
pub fn find_aliases(document: &Document) -> AliasReport {
    let mut scanner = Scanner {
        arena: &document.schemas,
        positions: BTreeMap::new(),
        expanded: HashSet::new(),
        lineage: Vec::new(),
        count: 0,
    };

    for (path, item) in &document.paths {
        scanner.path_item(item, &child_pointer("#/paths", path));
    }

    if let Some(components) = &document.components {
        for (name, slot) in &components.schemas {
            if let Some(id) = slot {
                scanner.schema(*id, child_pointer("#/components/schemas", name));
            }
        }
        for (name, response) in &components.responses {
            scanner.response(response, &child_pointer("#/components/responses", name));
        }
        for (name, body) in &components.request_bodies {
            let pointer = child_pointer("#/components/requestBodies", name);
            scanner.content(body.content.as_ref(), &pointer);
        }
        for (name, parameter) in &components.parameters {
            scanner.parameter(parameter, &child_pointer("#/components/parameters", name));
        }
        for (name, header) in &components.headers {
            let pointer = child_pointer("#/components/headers", name);
            scanner.optional_schema(header.schema, &pointer, "schema");
        }
    }

    let aliases = scanner
        .positions
        .into_iter()
        .filter(|(_, pointers)| pointers.len() > 1)
        .collect();
    AliasReport {
        aliases,
        positions: scanner.count,
    }
}

struct Scanner<'a> {
    arena: &'a SchemaArena,
    positions: BTreeMap<SchemaId, Vec<String>>,
    expanded: HashSet<SchemaId>,
    lineage: Vec<SchemaId>,
    count: usize,
}

impl Scanner<'_> {
    fn path_item(&mut self, item: &PathItem, pointer: &str) {
        for (index, parameter) in item.parameters.iter().flatten().enumerate() {
            let pointer = child_pointer(&child_pointer(pointer, "parameters"), &index.to_string());
            self.parameter(parameter, &pointer);
        }
        for (method, op) in &item.operations {
            self.operation(op, &child_pointer(pointer, method));
        }
    }

    fn operation(&mut self, op: &Operation, pointer: &str) {
        if let Some(body) = &op.request_body {
            self.content(body.content.as_ref(), &child_pointer(pointer, "requestBody"));
        }
        for (index, parameter) in op.parameters.iter().flatten().enumerate() {
            let pointer = child_pointer(&child_pointer(pointer, "parameters"), &index.to_string());
            self.parameter(parameter, &pointer);
        }
        for (status, response) in op.responses.iter().flatten() {
            let pointer = child_pointer(&child_pointer(pointer, "responses"), status);
            self.response(response, &pointer);
        }
        for (name, callback) in op.callbacks.iter().flatten() {
            let callback_pointer = child_pointer(&child_pointer(pointer, "callbacks"), name);
            for (expression, item) in callback {
                self.path_item(item, &child_pointer(&callback_pointer, expression));
            }
        }
    }

    fn parameter(&mut self, parameter: &Parameter, pointer: &str) {
        self.optional_schema(parameter.schema, pointer, "schema");
        self.content(parameter.content.as_ref(), pointer);
    }

    fn response(&mut self, response: &ApiResponse, pointer: &str) {
        self.content(response.content.as_ref(), pointer);
        for (name, header) in response.headers.iter().flatten() {
            let pointer = child_pointer(&child_pointer(pointer, "headers"), name);
            self.optional_schema(header.schema, &pointer, "schema");
        }
    }

    fn content(&mut self, content: Option<&BTreeMap<String, MediaType>>, pointer: &str) {
        for (media, media_type) in content.into_iter().flatten() {
            let pointer = child_pointer(&child_pointer(pointer, "content"), media);
            self.optional_schema(media_type.schema, &pointer, "schema");
        }
    }

    fn optional_schema(&mut self, id: Option<SchemaId>, pointer: &str, key: &str) {
        if let Some(id) = id {
            self.schema(id, child_pointer(pointer, key));
        }
    }

    fn schema(&mut self, id: SchemaId, pointer: String) {
        if self.lineage.contains(&id) {
            return;
        }
        self.count += 1;
        let first = !self.positions.contains_key(&id);
        self.positions.entry(id).or_default().push(pointer.clone());
        if !first || !self.expanded.insert(id) {
            return;
        }
        let arena = self.arena;
        let Some(schema) = arena.get(id) else {
            return;
        };

        self.lineage.push(id);
        if let Some(items) = schema.items {
            self.schema(items, child_pointer(&pointer, "items"));
        }
        if let Some(AdditionalProperties::Schema(values)) = schema.additional_properties {
            self.schema(values, child_pointer(&pointer, "additionalProperties"));
        }
        for (name, slot) in schema.properties.iter().flatten() {
            if let Some(child) = slot {
                let properties = child_pointer(&pointer, "properties");
                self.schema(*child, child_pointer(&properties, name));
            }
        }
        for (key, members) in [
            ("allOf", &schema.all_of),
            ("oneOf", &schema.one_of),
            ("anyOf", &schema.any_of),
        ] {
            for (index, member) in members.iter().flatten().enumerate() {
                if let Some(child) = member.schema() {
                    let list = child_pointer(&pointer, key);
                    self.schema(child, child_pointer(&list, &index.to_string()));
                }
            }
        }
        self.lineage.pop();
    }
}
