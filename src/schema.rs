//! Schema
//!
//! A [`Schema`] is the resolved, typed model of one definition. Construction
//! resolves references, normalizes terse definitions into canonical
//! object/array form and builds the attribute tree. A built schema is
//! immutable and can be shared by concurrent render tasks.
//!
//! ## Terse definitions
//!
//! A definition with neither `type` nor `properties`/`items` at the top level
//! is treated as a bare map of fields:
//!
//! ```json
//! { "title": "film", "name": "string", "year": { "type": "integer" } }
//! ```
//!
//! is read as
//!
//! ```json
//! { "title": "film", "properties": { "name": { "type": "string" }, "year": { "type": "integer" } } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::attribute::{ElementAttribute, FieldAttribute, UNTITLED_ELEMENT};
use crate::context::RenderContext;
use crate::error::{RenderError, Result};
use crate::resolver::Resolver;
use crate::types::{TypeRegistry, TypeTag};

/// Title of top-level schemas that declare none
pub const DEFAULT_TITLE: &str = "untitled";

/// Keys that never name a field in a terse definition
const STRUCTURAL_KEYS: [&str; 4] = ["$id", "$schema", "definitions", "required"];

/// Keys kept at the top level of a terse definition unless their value is a
/// field description (a type name or a definition map)
const METADATA_KEYS: [&str; 5] = ["id", "title", "description", "endpoint", "default"];

/// Keys that mark a value as a definition rather than a terse field map
const DEFINITION_KEYS: [&str; 3] = ["type", "properties", "items"];

// =============================================================================
// Types
// =============================================================================

/// Resolved shape of a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    Object,
    Array,
}

/// Attribute set: one or more fields, or exactly one element description
#[derive(Debug, Clone)]
pub enum Attributes {
    Fields(Vec<FieldAttribute>),
    Element(ElementAttribute),
}

/// Where a schema's definition comes from
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// An inline definition
    Definition(Value),
    /// The identifier of a loaded definition
    Id(String),
}

impl From<Value> for SchemaSource {
    fn from(definition: Value) -> Self {
        Self::Definition(definition)
    }
}

impl From<&str> for SchemaSource {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for SchemaSource {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

/// Resolved schema with its attribute tree
#[derive(Debug, Clone)]
pub struct Schema {
    title: String,
    schema_type: SchemaType,
    attributes: Attributes,
    required: Vec<String>,
    endpoint: Option<String>,
    definition: Value,
}

impl Schema {
    /// Build a schema from an inline definition or a loaded definition's id
    pub fn new(ctx: &RenderContext, source: impl Into<SchemaSource>) -> Result<Self> {
        let definition = match source.into() {
            SchemaSource::Definition(definition) => definition,
            SchemaSource::Id(id) => ctx.definitions.find(&id)?.clone(),
        };

        let resolved = Resolver::new(&ctx.definitions).resolve(&definition);
        let schema = Self::build(&ctx.types, resolved, None, false)?;
        info!(title = %schema.title, kind = ?schema.schema_type, "built schema");
        Ok(schema)
    }

    pub fn from_definition(ctx: &RenderContext, definition: Value) -> Result<Self> {
        Self::new(ctx, SchemaSource::Definition(definition))
    }

    pub fn from_id(ctx: &RenderContext, id: &str) -> Result<Self> {
        Self::new(ctx, SchemaSource::Id(id.to_string()))
    }

    /// Build from an already resolved definition
    pub(crate) fn build(
        types: &TypeRegistry,
        definition: Value,
        default_title: Option<&str>,
        required: bool,
    ) -> Result<Self> {
        let definition = normalize(types, definition);

        let declared_title = definition.get("title").and_then(Value::as_str);
        let title = declared_title
            .or(default_title)
            .unwrap_or(DEFAULT_TITLE)
            .to_string();
        let endpoint = definition
            .get("endpoint")
            .and_then(Value::as_str)
            .map(str::to_string);

        let schema_type = schema_type(types, &definition)?;
        debug!(%title, ?schema_type, "building schema");

        let (attributes, required_fields) = match schema_type {
            SchemaType::Array => {
                let name = declared_title.or(default_title).unwrap_or(UNTITLED_ELEMENT);
                let element = ElementAttribute::new(types, name, &definition, required)?;
                (Attributes::Element(element), Vec::new())
            }
            SchemaType::Object => {
                let required_fields = required_list(&definition);
                let fields = build_fields(types, &definition, &required_fields)?;

                if let Some(missing) = required_fields
                    .iter()
                    .find(|name| !fields.iter().any(|f| f.name() == name.as_str()))
                {
                    return Err(RenderError::InvalidRequire {
                        schema: title,
                        name: missing.clone(),
                    });
                }

                let required_fields = fields
                    .iter()
                    .filter(|f| f.is_required())
                    .map(|f| f.name().to_string())
                    .collect();
                (Attributes::Fields(fields), required_fields)
            }
        };

        Ok(Self {
            title,
            schema_type,
            attributes,
            required: required_fields,
            endpoint,
            definition,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn schema_type(&self) -> SchemaType {
        self.schema_type
    }

    pub fn is_array(&self) -> bool {
        self.schema_type == SchemaType::Array
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Field attributes in declaration order (empty for array schemas)
    pub fn fields(&self) -> &[FieldAttribute] {
        match &self.attributes {
            Attributes::Fields(fields) => fields.as_slice(),
            Attributes::Element(_) => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldAttribute> {
        self.fields().iter().find(|f| f.name() == name)
    }

    /// Element attribute of an array schema
    pub fn element(&self) -> Option<&ElementAttribute> {
        match &self.attributes {
            Attributes::Element(element) => Some(element),
            Attributes::Fields(_) => None,
        }
    }

    /// Names of required fields
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Endpoint template declared by the definition
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Normalized, reference-free definition
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serialize `data` against the attribute tree.
    ///
    /// Object schemas read each field by name: an absent key falls back to the
    /// default (or faux data offline), an explicit null is kept. Input that is
    /// not a map is treated as `{}`.
    pub fn serialize(&self, ctx: &RenderContext, data: &Value) -> Result<Value> {
        match &self.attributes {
            Attributes::Element(element) => element.serialize(ctx, Some(data)),
            Attributes::Fields(fields) => {
                let empty = Map::new();
                let input = data.as_object().unwrap_or(&empty);

                let mut output = Map::with_capacity(fields.len());
                for field in fields {
                    let value = field.serialize(ctx, input.get(field.name()), true)?;
                    output.insert(field.name().to_string(), value);
                }
                Ok(Value::Object(output))
            }
        }
    }

    /// Fetch data from `endpoint` in live mode, or use `explicit` offline, and
    /// serialize it
    pub async fn render(&self, ctx: &RenderContext, explicit: &Value, endpoint: &str) -> Result<Value> {
        if ctx.live {
            let data = self.fetch(ctx, endpoint).await?;
            self.serialize(ctx, &data)
        } else {
            self.serialize(ctx, explicit)
        }
    }

    async fn fetch(&self, ctx: &RenderContext, endpoint: &str) -> Result<Value> {
        info!(title = %self.title, endpoint, "fetching");
        let response = ctx.transport.fetch(endpoint).await?;

        if !response.is_success() {
            return Err(RenderError::RequestError {
                endpoint: endpoint.to_string(),
                response: format!("{} {}", response.status, response.body),
            });
        }

        let data: Value = serde_json::from_str(&response.body).map_err(|_| RenderError::InvalidResponse {
            endpoint: endpoint.to_string(),
            body: response.body.clone(),
        })?;

        Ok(self.unwrap_titled(data))
    }

    /// `{"<title>": {...}}` responses are unwrapped; anything else is used as-is
    fn unwrap_titled(&self, data: Value) -> Value {
        match data {
            Value::Object(mut map) => match map.remove(&self.title) {
                Some(inner) if !inner.is_null() => inner,
                Some(inner) => {
                    map.insert(self.title.clone(), inner);
                    Value::Object(map)
                }
                None => Value::Object(map),
            },
            other => other,
        }
    }
}

// =============================================================================
// Construction helpers
// =============================================================================

/// Array when the declared types include `array`, or when only `items` is given
fn schema_type(types: &TypeRegistry, definition: &Value) -> Result<SchemaType> {
    let declared = types.parse_list(definition.get("type"))?;
    let is_array = if declared.is_empty() {
        definition.get("items").is_some() && definition.get("properties").is_none()
    } else {
        declared.contains(&TypeTag::Array)
    };

    Ok(if is_array {
        SchemaType::Array
    } else {
        SchemaType::Object
    })
}

/// Field names listed in a draft-04 `required` array
fn required_list(definition: &Value) -> Vec<String> {
    definition
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn build_fields(
    types: &TypeRegistry,
    definition: &Value,
    required: &[String],
) -> Result<Vec<FieldAttribute>> {
    let Some(properties) = definition.get("properties").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };

    properties
        .iter()
        .map(|(name, field)| {
            let is_required = required.iter().any(|r| r == name);
            FieldAttribute::new(types, name, field, is_required)
        })
        .collect()
}

fn looks_like_definition(map: &Map<String, Value>) -> bool {
    DEFINITION_KEYS.iter().any(|key| map.contains_key(*key))
}

/// Does a metadata key hold a field rather than schema metadata?
fn is_terse_field(types: &TypeRegistry, value: &Value) -> bool {
    match value {
        Value::String(leaf) => types.is_type_name(leaf),
        Value::Object(child) => looks_like_definition(child),
        _ => false,
    }
}

/// Rewrite a terse definition into canonical form; non-map input becomes `{}`
fn normalize(types: &TypeRegistry, definition: Value) -> Value {
    let Value::Object(map) = definition else {
        return Value::Object(Map::new());
    };
    if looks_like_definition(&map) {
        return Value::Object(map);
    }

    let mut top = Map::new();
    let mut properties = Map::new();
    for (key, value) in map {
        let structural = STRUCTURAL_KEYS.contains(&key.as_str());
        let metadata = METADATA_KEYS.contains(&key.as_str()) && !is_terse_field(types, &value);
        if structural || metadata {
            top.insert(key, value);
            continue;
        }

        match value {
            Value::String(leaf) => {
                let mut field = Map::new();
                field.insert("type".to_string(), Value::String(leaf));
                properties.insert(key, Value::Object(field));
            }
            Value::Object(child) if child.is_empty() || looks_like_definition(&child) => {
                properties.insert(key, Value::Object(child));
            }
            Value::Object(child) => {
                properties.insert(key, normalize(types, Value::Object(child)));
            }
            other => {
                top.insert(key, other);
            }
        }
    }

    if !properties.is_empty() {
        top.insert("properties".to_string(), Value::Object(properties));
    }
    Value::Object(top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Transport, TransportResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct FixedTransport(TransportResponse);

    #[async_trait]
    impl Transport for FixedTransport {
        async fn fetch(&self, _url: &str) -> Result<TransportResponse> {
            Ok(self.0.clone())
        }
    }

    fn live_with(status: u16, body: &str) -> RenderContext {
        RenderContext::new().with_transport(Arc::new(FixedTransport(TransportResponse::new(status, body))))
    }

    fn film() -> Value {
        json!({
            "title": "film",
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "year": { "type": "integer" },
                "genre": { "enum": ["horror", "action"] }
            }
        })
    }

    #[test]
    fn test_builds_object_schema() {
        let ctx = RenderContext::new();
        let schema = Schema::from_definition(&ctx, film()).unwrap();
        assert_eq!(schema.title(), "film");
        assert_eq!(schema.schema_type(), SchemaType::Object);
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["name", "year", "genre"]);
    }

    #[test]
    fn test_serialize_round_trip() {
        let ctx = RenderContext::new();
        let schema = Schema::from_definition(&ctx, film()).unwrap();
        let output = schema
            .serialize(&ctx, &json!({ "name": "Alien", "year": "1979", "genre": "horror" }))
            .unwrap();
        assert_eq!(output, json!({ "name": "Alien", "year": 1979, "genre": "horror" }));
    }

    #[test]
    fn test_explicit_null_is_kept() {
        let ctx = RenderContext::new().with_live(false);
        let schema = Schema::from_definition(&ctx, film()).unwrap();
        let output = schema.serialize(&ctx, &json!({ "name": null })).unwrap();
        assert_eq!(output["name"], Value::Null);
        assert!(output["year"].is_i64());
    }

    #[test]
    fn test_non_map_input_is_empty_map() {
        let ctx = RenderContext::new();
        let schema = Schema::from_definition(&ctx, film()).unwrap();
        let output = schema.serialize(&ctx, &json!("nonsense")).unwrap();
        assert_eq!(output, json!({ "name": null, "year": null, "genre": null }));
    }

    #[test]
    fn test_required_list_must_name_fields() {
        let ctx = RenderContext::new();
        let err = Schema::from_definition(
            &ctx,
            json!({ "title": "film", "properties": { "name": { "type": "string" } }, "required": ["year"] }),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::InvalidRequire { schema, name } if schema == "film" && name == "year"));
    }

    #[test]
    fn test_required_per_field_and_list() {
        let ctx = RenderContext::new();
        let schema = Schema::from_definition(
            &ctx,
            json!({
                "properties": {
                    "name": { "type": "string", "required": true },
                    "year": { "type": "integer" },
                    "id": { "type": "uuid" }
                },
                "required": ["id"]
            }),
        )
        .unwrap();
        assert_eq!(schema.title(), DEFAULT_TITLE);
        assert_eq!(schema.required(), ["name".to_string(), "id".to_string()]);
    }

    #[test]
    fn test_terse_definition() {
        let ctx = RenderContext::new().with_live(false);
        let schema = Schema::from_definition(
            &ctx,
            json!({
                "title": "film",
                "endpoint": "http://films.local/films/{id}",
                "name": "string",
                "year": { "type": "integer", "minimum": 1900, "maximum": 2000 },
                "director": { "name": "string" }
            }),
        )
        .unwrap();

        assert_eq!(schema.endpoint(), Some("http://films.local/films/{id}"));
        assert_eq!(schema.fields().len(), 3);
        let director = schema.field("director").unwrap().schema().unwrap();
        assert_eq!(director.title(), "director");

        let output = schema.serialize(&ctx, &json!({})).unwrap();
        assert!(output["name"].is_string());
        assert!(output["director"]["name"].is_string());
    }

    #[test]
    fn test_terse_fields_named_like_metadata() {
        let ctx = RenderContext::new();
        let schema = Schema::from_definition(
            &ctx,
            json!({ "title": "film", "id": "string", "name": "string", "description": "Films on the shelf" }),
        )
        .unwrap();

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(schema.title(), "film");
        assert_eq!(schema.definition()["description"], "Films on the shelf");

        let output = schema.serialize(&ctx, &json!({ "id": "X", "name": "Alien" })).unwrap();
        assert_eq!(output, json!({ "id": "X", "name": "Alien" }));
    }

    #[test]
    fn test_terse_metadata_stays_top_level() {
        let ctx = RenderContext::new();
        let schema = Schema::from_definition(
            &ctx,
            json!({
                "title": "security",
                "endpoint": "http://films.local/{id}",
                "id": { "type": "uuid" },
                "$schema": "string",
                "code": "string"
            }),
        )
        .unwrap();

        assert_eq!(schema.title(), "security");
        assert_eq!(schema.endpoint(), Some("http://films.local/{id}"));
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "code"]);
    }

    #[test]
    fn test_array_schema() {
        let ctx = RenderContext::new();
        let schema = Schema::from_definition(
            &ctx,
            json!({ "title": "years", "type": "array", "items": { "type": "integer" } }),
        )
        .unwrap();
        assert!(schema.is_array());
        assert!(schema.fields().is_empty());
        assert_eq!(schema.serialize(&ctx, &json!(["1", 2])).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_array_of_schemas() {
        let ctx = RenderContext::new();
        let schema = Schema::from_definition(
            &ctx,
            json!({
                "title": "films",
                "type": "array",
                "items": { "properties": { "id": { "type": "string" } } }
            }),
        )
        .unwrap();
        let element = schema.element().unwrap();
        assert!(!element.is_archetype());
        assert_eq!(
            schema.serialize(&ctx, &json!([{ "id": "A", "extra": 1 }])).unwrap(),
            json!([{ "id": "A" }])
        );
    }

    #[test]
    fn test_schema_from_registry() {
        let mut ctx = RenderContext::new();
        ctx.definitions.load(json!({ "id": "film", "title": "film", "name": "string" })).unwrap();
        let schema = Schema::new(&ctx, "film").unwrap();
        assert_eq!(schema.fields().len(), 1);

        assert!(matches!(
            Schema::from_id(&ctx, "missing"),
            Err(RenderError::DefinitionNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_field_type() {
        let ctx = RenderContext::new();
        let err = Schema::from_definition(&ctx, json!({ "properties": { "x": { "type": "Blob" } } })).unwrap_err();
        assert!(matches!(err, RenderError::InvalidType(_)));
    }

    #[tokio::test]
    async fn test_offline_render_uses_explicit_data() {
        let ctx = RenderContext::new().with_live(false);
        let schema = Schema::from_definition(&ctx, film()).unwrap();
        let output = schema.render(&ctx, &json!({ "name": "Heat" }), "").await.unwrap();
        assert_eq!(output["name"], "Heat");
    }

    #[tokio::test]
    async fn test_live_render_unwraps_title() {
        let ctx = live_with(200, r#"{ "film": { "name": "Alien", "year": 1979 } }"#);
        let schema = Schema::from_definition(&ctx, film()).unwrap();
        let output = schema.render(&ctx, &Value::Null, "http://films.local/1").await.unwrap();
        assert_eq!(output, json!({ "name": "Alien", "year": 1979, "genre": null }));
    }

    #[tokio::test]
    async fn test_live_render_request_error() {
        let ctx = live_with(500, "boom");
        let schema = Schema::from_definition(&ctx, film()).unwrap();
        let err = schema.render(&ctx, &Value::Null, "http://films.local/1").await.unwrap_err();
        assert!(matches!(err, RenderError::RequestError { endpoint, .. } if endpoint == "http://films.local/1"));
    }

    #[tokio::test]
    async fn test_live_render_invalid_response() {
        let ctx = live_with(200, "<html>");
        let schema = Schema::from_definition(&ctx, film()).unwrap();
        let err = schema.render(&ctx, &Value::Null, "http://films.local/1").await.unwrap_err();
        assert!(matches!(err, RenderError::InvalidResponse { body, .. } if body == "<html>"));
    }
}
