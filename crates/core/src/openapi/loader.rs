//! OpenAPI JSON/YAML -> [`Document`].
//!
//! With [`LoadOptions::intern_fragments`] set, every schema fragment that is
//! structurally identical to one already loaded reuses that node instead of
//! allocating a new one. That is how memoizing parsers behave, and it is what
//! leaves a freshly loaded document full of aliases.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tracing::debug;

use super::spec::{
    AdditionalProperties, ApiResponse, Components, Dialect, Document, Extra, HTTP_METHODS, Header,
    MediaType, Member, Operation, Parameter, PathItem, RequestBody, Schema, SchemaArena, SchemaId,
    SchemaType,
};
use crate::error::{Error, Result};

/// Loader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Share one node between structurally identical schema fragments.
    pub intern_fragments: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            intern_fragments: true,
        }
    }
}

/// Parse an OpenAPI document from a JSON string.
pub fn load_json(json: &str, options: LoadOptions) -> Result<Document> {
    let value: Value = serde_json::from_str(json)?;
    load_value(value, options)
}

/// Parse an OpenAPI document from a YAML string.
pub fn load_yaml(yaml: &str, options: LoadOptions) -> Result<Document> {
    let value: Value = serde_yaml::from_str(yaml)?;
    load_value(value, options)
}

/// Build a document from an already parsed JSON value.
pub fn load_value(value: Value, options: LoadOptions) -> Result<Document> {
    let mut root = object(value, "#")?;

    let openapi = match root.remove("openapi") {
        Some(Value::String(version)) => version,
        Some(_) => {
            return Err(Error::InvalidShape {
                pointer: "#/openapi".into(),
                expected: "a version string",
            });
        }
        None => return Err(Error::MissingVersion),
    };
    let dialect =
        Dialect::from_version(&openapi).ok_or_else(|| Error::UnsupportedVersion(openapi.clone()))?;

    let mut loader = Loader {
        arena: SchemaArena::new(),
        interned: HashMap::new(),
        dialect,
        options,
    };
    let paths = match root.remove("paths") {
        Some(paths) => loader.map_of(paths, "#/paths", Loader::path_item)?,
        None => BTreeMap::new(),
    };
    let components = root
        .remove("components")
        .map(|c| loader.components(c, "#/components"))
        .transpose()?;

    debug!(
        nodes = loader.arena.len(),
        interned = loader.interned.len(),
        "Loaded OpenAPI document."
    );

    Ok(Document {
        openapi,
        dialect,
        paths,
        components,
        schemas: loader.arena,
        extra: into_extra(root),
    })
}

/// Append `key` to a JSON pointer, escaping `~` and `/`.
pub fn child_pointer(pointer: &str, key: &str) -> String {
    format!("{pointer}/{}", key.replace('~', "~0").replace('/', "~1"))
}

fn object(value: Value, pointer: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::InvalidShape {
            pointer: pointer.to_string(),
            expected: "an object",
        }),
    }
}

fn into_extra(map: Map<String, Value>) -> Extra {
    map.into_iter().collect()
}

/// Remove `key` if it holds a string; any other value stays for `extra`.
fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !matches!(map.get(key), Some(Value::String(_))) {
        return None;
    }
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn take_bool(map: &mut Map<String, Value>, key: &str) -> Option<bool> {
    let value = map.get(key)?.as_bool()?;
    map.remove(key);
    Some(value)
}

fn take_array(map: &mut Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    if !matches!(map.get(key), Some(Value::Array(_))) {
        return None;
    }
    match map.remove(key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Option<Value> {
    if !matches!(map.get(key), Some(Value::Object(_))) {
        return None;
    }
    map.remove(key)
}

fn take_string_list(map: &mut Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let all_strings = map
        .get(key)?
        .as_array()?
        .iter()
        .all(Value::is_string);
    if !all_strings {
        return None;
    }
    let items = take_array(map, key)?;
    Some(
        items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
    )
}

struct Loader {
    arena: SchemaArena,
    interned: HashMap<String, SchemaId>,
    dialect: Dialect,
    options: LoadOptions,
}

impl Loader {
    fn map_of<T>(
        &mut self,
        value: Value,
        pointer: &str,
        load: fn(&mut Self, Value, &str) -> Result<T>,
    ) -> Result<BTreeMap<String, T>> {
        let mut out = BTreeMap::new();
        for (key, item) in object(value, pointer)? {
            let item_pointer = child_pointer(pointer, &key);
            out.insert(key, load(self, item, &item_pointer)?);
        }
        Ok(out)
    }

    fn list_of<T>(
        &mut self,
        value: Value,
        pointer: &str,
        load: fn(&mut Self, Value, &str) -> Result<T>,
    ) -> Result<Vec<T>> {
        let Value::Array(items) = value else {
            return Err(Error::InvalidShape {
                pointer: pointer.to_string(),
                expected: "an array",
            });
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| load(self, item, &child_pointer(pointer, &index.to_string())))
            .collect()
    }

    fn components(&mut self, value: Value, pointer: &str) -> Result<Components> {
        let mut map = object(value, pointer)?;
        let mut components = Components::default();

        if let Some(schemas) = map.remove("schemas") {
            components.schemas =
                self.map_of(schemas, &child_pointer(pointer, "schemas"), Self::nullable_schema)?;
        }
        if let Some(responses) = map.remove("responses") {
            components.responses =
                self.map_of(responses, &child_pointer(pointer, "responses"), Self::response)?;
        }
        if let Some(bodies) = map.remove("requestBodies") {
            components.request_bodies =
                self.map_of(bodies, &child_pointer(pointer, "requestBodies"), Self::request_body)?;
        }
        if let Some(parameters) = map.remove("parameters") {
            components.parameters =
                self.map_of(parameters, &child_pointer(pointer, "parameters"), Self::parameter)?;
        }
        if let Some(headers) = map.remove("headers") {
            components.headers =
                self.map_of(headers, &child_pointer(pointer, "headers"), Self::header)?;
        }

        components.extra = into_extra(map);
        Ok(components)
    }

    fn path_item(&mut self, value: Value, pointer: &str) -> Result<PathItem> {
        let mut map = object(value, pointer)?;
        let mut item = PathItem::default();

        for method in HTTP_METHODS {
            if let Some(op) = map.remove(method) {
                let op = self.operation(op, &child_pointer(pointer, method))?;
                item.operations.insert(method.to_string(), op);
            }
        }
        if let Some(parameters) = map.remove("parameters") {
            item.parameters = Some(self.list_of(
                parameters,
                &child_pointer(pointer, "parameters"),
                Self::parameter,
            )?);
        }

        item.extra = into_extra(map);
        Ok(item)
    }

    fn operation(&mut self, value: Value, pointer: &str) -> Result<Operation> {
        let mut map = object(value, pointer)?;
        let mut op = Operation::default();

        if let Some(parameters) = map.remove("parameters") {
            op.parameters = Some(self.list_of(
                parameters,
                &child_pointer(pointer, "parameters"),
                Self::parameter,
            )?);
        }
        if let Some(body) = map.remove("requestBody") {
            op.request_body = Some(self.request_body(body, &child_pointer(pointer, "requestBody"))?);
        }
        if let Some(responses) = map.remove("responses") {
            op.responses =
                Some(self.map_of(responses, &child_pointer(pointer, "responses"), Self::response)?);
        }
        if let Some(callbacks) = map.remove("callbacks") {
            op.callbacks = Some(self.map_of(
                callbacks,
                &child_pointer(pointer, "callbacks"),
                Self::callback,
            )?);
        }

        op.extra = into_extra(map);
        Ok(op)
    }

    fn callback(&mut self, value: Value, pointer: &str) -> Result<BTreeMap<String, PathItem>> {
        self.map_of(value, pointer, Self::path_item)
    }

    fn parameter(&mut self, value: Value, pointer: &str) -> Result<Parameter> {
        let mut map = object(value, pointer)?;
        let ref_path = take_string(&mut map, "$ref");
        let schema = take_object(&mut map, "schema")
            .map(|s| self.schema(s, &child_pointer(pointer, "schema")))
            .transpose()?;
        let content = self.content(&mut map, pointer)?;
        Ok(Parameter {
            ref_path,
            schema,
            content,
            extra: into_extra(map),
        })
    }

    fn request_body(&mut self, value: Value, pointer: &str) -> Result<RequestBody> {
        let mut map = object(value, pointer)?;
        let ref_path = take_string(&mut map, "$ref");
        let content = self.content(&mut map, pointer)?;
        Ok(RequestBody {
            ref_path,
            content,
            extra: into_extra(map),
        })
    }

    fn response(&mut self, value: Value, pointer: &str) -> Result<ApiResponse> {
        let mut map = object(value, pointer)?;
        let ref_path = take_string(&mut map, "$ref");
        let content = self.content(&mut map, pointer)?;
        let headers = map
            .remove("headers")
            .map(|h| self.map_of(h, &child_pointer(pointer, "headers"), Self::header))
            .transpose()?;
        Ok(ApiResponse {
            ref_path,
            content,
            headers,
            extra: into_extra(map),
        })
    }

    fn header(&mut self, value: Value, pointer: &str) -> Result<Header> {
        let mut map = object(value, pointer)?;
        let ref_path = take_string(&mut map, "$ref");
        let schema = take_object(&mut map, "schema")
            .map(|s| self.schema(s, &child_pointer(pointer, "schema")))
            .transpose()?;
        Ok(Header {
            ref_path,
            schema,
            extra: into_extra(map),
        })
    }

    fn content(
        &mut self,
        map: &mut Map<String, Value>,
        pointer: &str,
    ) -> Result<Option<BTreeMap<String, MediaType>>> {
        map.remove("content")
            .map(|c| self.map_of(c, &child_pointer(pointer, "content"), Self::media_type))
            .transpose()
    }

    fn media_type(&mut self, value: Value, pointer: &str) -> Result<MediaType> {
        let mut map = object(value, pointer)?;
        let schema = take_object(&mut map, "schema")
            .map(|s| self.schema(s, &child_pointer(pointer, "schema")))
            .transpose()?;
        Ok(MediaType {
            schema,
            extra: into_extra(map),
        })
    }

    fn nullable_schema(&mut self, value: Value, pointer: &str) -> Result<Option<SchemaId>> {
        match value {
            Value::Null => Ok(None),
            value => self.schema(value, pointer).map(Some),
        }
    }

    fn member(&mut self, value: Value, pointer: &str) -> Result<Member> {
        match value {
            Value::Null => Ok(Member::Null),
            Value::Object(_) => self.schema(value, pointer).map(Member::Schema),
            other => Ok(Member::Invalid(other)),
        }
    }

    fn schema(&mut self, value: Value, pointer: &str) -> Result<SchemaId> {
        let key = self.options.intern_fragments.then(|| value.to_string());
        if let Some(id) = key.as_ref().and_then(|k| self.interned.get(k)) {
            return Ok(*id);
        }

        let schema = self.schema_fields(value, pointer)?;
        let id = self.arena.insert(schema);
        if let Some(key) = key {
            self.interned.insert(key, id);
        }
        Ok(id)
    }

    fn schema_fields(&mut self, value: Value, pointer: &str) -> Result<Schema> {
        let mut map = object(value, pointer)?;
        let mut schema = Schema {
            ref_path: take_string(&mut map, "$ref"),
            title: take_string(&mut map, "title"),
            description: take_string(&mut map, "description"),
            format: take_string(&mut map, "format"),
            required: take_string_list(&mut map, "required"),
            enum_values: take_array(&mut map, "enum"),
            default: map.remove("default"),
            ..Schema::default()
        };

        // Keywords of the other dialect stay verbatim in `extra`.
        match self.dialect {
            Dialect::V30 => schema.nullable = take_bool(&mut map, "nullable"),
            Dialect::V31 => {
                schema.const_value = map.remove("const");
                schema.examples = take_array(&mut map, "examples");
            }
        }

        schema.schema_type = match take_string(&mut map, "type") {
            Some(single) => Some(SchemaType::Single(single)),
            None => take_string_list(&mut map, "type").map(SchemaType::Multiple),
        };

        if let Some(items) = take_object(&mut map, "items") {
            schema.items = Some(self.schema(items, &child_pointer(pointer, "items"))?);
        }

        schema.additional_properties = match map.get("additionalProperties") {
            Some(Value::Bool(flag)) => {
                let flag = *flag;
                map.remove("additionalProperties");
                Some(AdditionalProperties::Bool(flag))
            }
            Some(Value::Object(_)) => take_object(&mut map, "additionalProperties")
                .map(|v| self.schema(v, &child_pointer(pointer, "additionalProperties")))
                .transpose()?
                .map(AdditionalProperties::Schema),
            _ => None,
        };

        if let Some(properties) = take_object(&mut map, "properties") {
            schema.properties = Some(self.map_of(
                properties,
                &child_pointer(pointer, "properties"),
                Self::nullable_schema,
            )?);
        }

        for (key, slot) in [
            ("allOf", &mut schema.all_of),
            ("oneOf", &mut schema.one_of),
            ("anyOf", &mut schema.any_of),
        ] {
            if let Some(members) = take_array(&mut map, key) {
                let members_pointer = child_pointer(pointer, key);
                *slot = Some(self.list_of(Value::Array(members), &members_pointer, Self::member)?);
            }
        }

        schema.extra = into_extra(map);
        Ok(schema)
    }
}
