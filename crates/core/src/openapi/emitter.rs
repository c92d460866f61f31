//! [`Document`] -> OpenAPI JSON/YAML.
//!
//! The emitted tree is a plain JSON value: every schema position is written
//! out in full, so a node referenced from several places appears several
//! times. A schema that reaches itself structurally has no tree form and is
//! rejected with [`Error::CyclicSchema`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::loader::child_pointer;
use super::spec::{
    AdditionalProperties, ApiResponse, Components, Document, Extra, Header, MediaType, Member,
    Operation, Parameter, PathItem, RequestBody, SchemaArena, SchemaId, SchemaType,
};
use crate::error::{Error, Result};

/// Convert the document to a JSON value.
pub fn to_value(document: &Document) -> Result<Value> {
    let mut emitter = Emitter {
        arena: &document.schemas,
        lineage: Vec::new(),
    };

    let mut root = object_from(&document.extra);
    root.insert("openapi".into(), Value::String(document.openapi.clone()));
    root.insert(
        "paths".into(),
        emitter.map_of(&document.paths, "#/paths", Emitter::path_item)?,
    );
    if let Some(components) = &document.components {
        root.insert(
            "components".into(),
            emitter.components(components, "#/components")?,
        );
    }
    Ok(Value::Object(root))
}

/// Serialize the document as JSON text.
pub fn to_json_string(document: &Document, pretty: bool) -> Result<String> {
    let value = to_value(document)?;
    let text = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(text)
}

/// Serialize the document as YAML text.
pub fn to_yaml_string(document: &Document) -> Result<String> {
    Ok(serde_yaml::to_string(&to_value(document)?)?)
}

fn object_from(extra: &Extra) -> Map<String, Value> {
    extra.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn insert_some(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

struct Emitter<'a> {
    arena: &'a SchemaArena,
    lineage: Vec<SchemaId>,
}

impl Emitter<'_> {
    fn map_of<T>(
        &mut self,
        map: &BTreeMap<String, T>,
        pointer: &str,
        emit: fn(&mut Self, &T, &str) -> Result<Value>,
    ) -> Result<Value> {
        let mut out = Map::new();
        for (key, item) in map {
            out.insert(key.clone(), emit(self, item, &child_pointer(pointer, key))?);
        }
        Ok(Value::Object(out))
    }

    fn list_of<T>(
        &mut self,
        items: &[T],
        pointer: &str,
        emit: fn(&mut Self, &T, &str) -> Result<Value>,
    ) -> Result<Value> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| emit(self, item, &child_pointer(pointer, &index.to_string())))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn components(&mut self, components: &Components, pointer: &str) -> Result<Value> {
        let mut map = object_from(&components.extra);
        if !components.schemas.is_empty() {
            let value = self.map_of(
                &components.schemas,
                &child_pointer(pointer, "schemas"),
                Self::nullable_schema,
            )?;
            map.insert("schemas".into(), value);
        }
        if !components.responses.is_empty() {
            let value = self.map_of(
                &components.responses,
                &child_pointer(pointer, "responses"),
                Self::response,
            )?;
            map.insert("responses".into(), value);
        }
        if !components.request_bodies.is_empty() {
            let value = self.map_of(
                &components.request_bodies,
                &child_pointer(pointer, "requestBodies"),
                Self::request_body,
            )?;
            map.insert("requestBodies".into(), value);
        }
        if !components.parameters.is_empty() {
            let value = self.map_of(
                &components.parameters,
                &child_pointer(pointer, "parameters"),
                Self::parameter,
            )?;
            map.insert("parameters".into(), value);
        }
        if !components.headers.is_empty() {
            let value = self.map_of(
                &components.headers,
                &child_pointer(pointer, "headers"),
                Self::header,
            )?;
            map.insert("headers".into(), value);
        }
        Ok(Value::Object(map))
    }

    fn path_item(&mut self, item: &PathItem, pointer: &str) -> Result<Value> {
        let mut map = object_from(&item.extra);
        for (method, op) in &item.operations {
            map.insert(
                method.clone(),
                self.operation(op, &child_pointer(pointer, method))?,
            );
        }
        if let Some(parameters) = &item.parameters {
            let value =
                self.list_of(parameters, &child_pointer(pointer, "parameters"), Self::parameter)?;
            map.insert("parameters".into(), value);
        }
        Ok(Value::Object(map))
    }

    fn operation(&mut self, op: &Operation, pointer: &str) -> Result<Value> {
        let mut map = object_from(&op.extra);
        if let Some(parameters) = &op.parameters {
            let value =
                self.list_of(parameters, &child_pointer(pointer, "parameters"), Self::parameter)?;
            map.insert("parameters".into(), value);
        }
        if let Some(body) = &op.request_body {
            let value = self.request_body(body, &child_pointer(pointer, "requestBody"))?;
            map.insert("requestBody".into(), value);
        }
        if let Some(responses) = &op.responses {
            let value =
                self.map_of(responses, &child_pointer(pointer, "responses"), Self::response)?;
            map.insert("responses".into(), value);
        }
        if let Some(callbacks) = &op.callbacks {
            let value =
                self.map_of(callbacks, &child_pointer(pointer, "callbacks"), Self::callback)?;
            map.insert("callbacks".into(), value);
        }
        Ok(Value::Object(map))
    }

    fn callback(&mut self, callback: &BTreeMap<String, PathItem>, pointer: &str) -> Result<Value> {
        self.map_of(callback, pointer, Self::path_item)
    }

    fn parameter(&mut self, parameter: &Parameter, pointer: &str) -> Result<Value> {
        let mut map = object_from(&parameter.extra);
        insert_some(&mut map, "$ref", parameter.ref_path.clone().map(Value::String));
        if let Some(schema) = parameter.schema {
            map.insert(
                "schema".into(),
                self.schema(schema, &child_pointer(pointer, "schema"))?,
            );
        }
        insert_some(&mut map, "content", self.content(parameter.content.as_ref(), pointer)?);
        Ok(Value::Object(map))
    }

    fn request_body(&mut self, body: &RequestBody, pointer: &str) -> Result<Value> {
        let mut map = object_from(&body.extra);
        insert_some(&mut map, "$ref", body.ref_path.clone().map(Value::String));
        insert_some(&mut map, "content", self.content(body.content.as_ref(), pointer)?);
        Ok(Value::Object(map))
    }

    fn response(&mut self, response: &ApiResponse, pointer: &str) -> Result<Value> {
        let mut map = object_from(&response.extra);
        insert_some(&mut map, "$ref", response.ref_path.clone().map(Value::String));
        insert_some(&mut map, "content", self.content(response.content.as_ref(), pointer)?);
        if let Some(headers) = &response.headers {
            let value = self.map_of(headers, &child_pointer(pointer, "headers"), Self::header)?;
            map.insert("headers".into(), value);
        }
        Ok(Value::Object(map))
    }

    fn header(&mut self, header: &Header, pointer: &str) -> Result<Value> {
        let mut map = object_from(&header.extra);
        insert_some(&mut map, "$ref", header.ref_path.clone().map(Value::String));
        if let Some(schema) = header.schema {
            map.insert(
                "schema".into(),
                self.schema(schema, &child_pointer(pointer, "schema"))?,
            );
        }
        Ok(Value::Object(map))
    }

    fn content(
        &mut self,
        content: Option<&BTreeMap<String, MediaType>>,
        pointer: &str,
    ) -> Result<Option<Value>> {
        content
            .map(|c| self.map_of(c, &child_pointer(pointer, "content"), Self::media_type))
            .transpose()
    }

    fn media_type(&mut self, media_type: &MediaType, pointer: &str) -> Result<Value> {
        let mut map = object_from(&media_type.extra);
        if let Some(schema) = media_type.schema {
            map.insert(
                "schema".into(),
                self.schema(schema, &child_pointer(pointer, "schema"))?,
            );
        }
        Ok(Value::Object(map))
    }

    #[allow(clippy::ref_option)]
    fn nullable_schema(&mut self, slot: &Option<SchemaId>, pointer: &str) -> Result<Value> {
        match slot {
            Some(id) => self.schema(*id, pointer),
            None => Ok(Value::Null),
        }
    }

    fn member(&mut self, member: &Member, pointer: &str) -> Result<Value> {
        match member {
            Member::Schema(id) => self.schema(*id, pointer),
            Member::Null => Ok(Value::Null),
            Member::Invalid(value) => Ok(value.clone()),
        }
    }

    fn schema(&mut self, id: SchemaId, pointer: &str) -> Result<Value> {
        if self.lineage.contains(&id) {
            return Err(Error::CyclicSchema {
                pointer: pointer.to_string(),
            });
        }
        let arena = self.arena;
        let schema = arena.get(id).ok_or(Error::DanglingSchema(id))?;

        self.lineage.push(id);
        let mut map = object_from(&schema.extra);

        insert_some(&mut map, "$ref", schema.ref_path.clone().map(Value::String));
        insert_some(
            &mut map,
            "type",
            schema.schema_type.as_ref().map(|t| match t {
                SchemaType::Single(name) => Value::String(name.clone()),
                SchemaType::Multiple(names) => {
                    Value::Array(names.iter().cloned().map(Value::String).collect())
                }
            }),
        );
        insert_some(&mut map, "title", schema.title.clone().map(Value::String));
        insert_some(&mut map, "description", schema.description.clone().map(Value::String));
        insert_some(&mut map, "format", schema.format.clone().map(Value::String));
        insert_some(
            &mut map,
            "required",
            schema
                .required
                .as_ref()
                .map(|names| Value::Array(names.iter().cloned().map(Value::String).collect())),
        );
        insert_some(&mut map, "enum", schema.enum_values.clone().map(Value::Array));
        insert_some(&mut map, "default", schema.default.clone());
        insert_some(&mut map, "nullable", schema.nullable.map(Value::Bool));
        insert_some(&mut map, "const", schema.const_value.clone());
        insert_some(&mut map, "examples", schema.examples.clone().map(Value::Array));

        if let Some(items) = schema.items {
            map.insert(
                "items".into(),
                self.schema(items, &child_pointer(pointer, "items"))?,
            );
        }
        match schema.additional_properties {
            Some(AdditionalProperties::Bool(flag)) => {
                map.insert("additionalProperties".into(), Value::Bool(flag));
            }
            Some(AdditionalProperties::Schema(values)) => {
                let value = self.schema(values, &child_pointer(pointer, "additionalProperties"))?;
                map.insert("additionalProperties".into(), value);
            }
            None => {}
        }
        if let Some(properties) = &schema.properties {
            let value = self.map_of(
                properties,
                &child_pointer(pointer, "properties"),
                Self::nullable_schema,
            )?;
            map.insert("properties".into(), value);
        }
        for (key, members) in [
            ("allOf", &schema.all_of),
            ("oneOf", &schema.one_of),
            ("anyOf", &schema.any_of),
        ] {
            if let Some(members) = members {
                let value = self.list_of(members, &child_pointer(pointer, key), Self::member)?;
                map.insert(key.into(), value);
            }
        }

        self.lineage.pop();
        Ok(Value::Object(map))
    }
}
