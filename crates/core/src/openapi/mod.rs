//! OpenAPI document model and the schema de-aliasing pass.
//!
//! The pipeline is:
//! 1. Load: OpenAPI JSON/YAML -> Document (schemas live in an arena)
//! 2. Dealias: every structural schema position gets its own node
//! 3. Emit: Document -> JSON/YAML
//!
//! [`find_aliases`] reports shared nodes without changing anything.

mod alias;
pub mod dealias;
mod emitter;
mod loader;
mod refs;
mod spec;

pub use alias::{AliasReport, find_aliases};
pub use dealias::{PassSummary, dealias};
pub use emitter::{to_json_string, to_value, to_yaml_string};
pub use loader::{LoadOptions, load_json, load_value, load_yaml};
pub use refs::{resolve, simple_ref};
pub use spec::{
    AdditionalProperties, ApiResponse, Components, Dialect, Document, Extra, HTTP_METHODS, Header,
    MediaType, Member, Operation, Parameter, PathItem, RequestBody, Schema, SchemaArena, SchemaId,
    SchemaType,
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const TEST_OPENAPI_JSON: &str = r##"{
  "openapi": "3.0.3",
  "info": { "title": "Test API", "version": "1.0.0" },
  "paths": {
    "/items": {
      "get": {
        "operationId": "listItems",
        "parameters": [
          { "name": "limit", "in": "query", "schema": { "type": "integer" } },
          { "name": "offset", "in": "query", "schema": { "type": "integer" } }
        ],
        "responses": {
          "200": { "description": "OK", "content": { "application/json": { "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Item" } } } } }
        }
      },
      "post": {
        "operationId": "createItem",
        "requestBody": { "$ref": "#/components/requestBodies/ItemBody" },
        "responses": {
          "201": { "$ref": "#/components/responses/Created" },
          "404": { "$ref": "#/components/responses/Gone" }
        }
      }
    }
  },
  "components": {
    "schemas": {
      "Item": {
        "type": "object",
        "properties": { "id": { "type": "integer" }, "name": { "type": "string" }, "label": { "type": "string" } }
      },
      "ItemInput": {
        "type": "object",
        "properties": { "name": { "type": "string" } }
      }
    },
    "requestBodies": {
      "ItemBody": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ItemInput" } } } }
    },
    "responses": {
      "Created": { "description": "Created", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Item" } } } }
    }
  }
}"##;

    #[test]
    fn test_load_dealias_emit() {
        let mut document = load_json(TEST_OPENAPI_JSON, LoadOptions::default()).unwrap();
        let before = to_value(&document).unwrap();

        // The integer, string and `$ref: Item` fragments are each interned once.
        let report = find_aliases(&document);
        assert_eq!(report.aliases.len(), 3, "{report:#?}");

        let summary = dealias(&mut document).unwrap();
        assert!(find_aliases(&document).is_clean());
        assert_eq!(summary.dangling_refs, vec!["#/components/responses/Gone"]);
        assert_eq!(summary.warnings(), 0);
        assert_eq!(summary.clones, 5);

        // Content is unchanged; only node identities differ.
        assert_eq!(to_value(&document).unwrap(), before);
    }

    #[test]
    fn test_second_pass_makes_no_copies() {
        let mut document = load_json(TEST_OPENAPI_JSON, LoadOptions::default()).unwrap();
        dealias(&mut document).unwrap();
        let nodes = document.schemas.len();

        let summary = dealias(&mut document).unwrap();
        assert_eq!(summary.clones, 0);
        assert_eq!(document.schemas.len(), nodes);
    }

    #[test]
    fn test_yaml_output_matches_json() {
        let document = load_json(TEST_OPENAPI_JSON, LoadOptions::default()).unwrap();
        let yaml = to_yaml_string(&document).unwrap();
        let reloaded = load_yaml(&yaml, LoadOptions::default()).unwrap();
        assert_eq!(to_value(&reloaded).unwrap(), to_value(&document).unwrap());
    }
}
