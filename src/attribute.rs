//! Attribute Model
//!
//! A [`FieldAttribute`] is one named slot of an object schema; an
//! [`ElementAttribute`] describes the shared shape of every member of an array
//! schema. Both carry a [`TypeInfo`] with the declared types, format,
//! enumeration, default and constraints, and either stand alone or own a
//! nested [`Schema`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::context::RenderContext;
use crate::error::Result;
use crate::schema::Schema;
use crate::types::{TypeRegistry, TypeTag};

/// Keys whose presence makes a definition own a nested schema
pub const SCHEMA_IDENTIFIERS: [&str; 2] = ["properties", "items"];

/// Name given to array elements of untitled schemas
pub const UNTITLED_ELEMENT: &str = "render_array_attribute_untitled";

/// Does this definition describe a nested schema?
pub fn is_nested_schema(definition: &Value) -> bool {
    SCHEMA_IDENTIFIERS
        .iter()
        .any(|key| definition.get(*key).is_some())
}

// =============================================================================
// Constraints
// =============================================================================

/// Numeric and string constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<f64>,
}

impl Constraints {
    /// Read constraints from a definition.
    ///
    /// `exclusiveMinimum`/`exclusiveMaximum` may be booleans qualifying
    /// `minimum`/`maximum`, or numeric bounds of their own.
    pub fn from_definition(definition: &Value) -> Self {
        let mut constraints = Self {
            min_length: usize_field(definition, "minLength"),
            max_length: usize_field(definition, "maxLength"),
            minimum: definition.get("minimum").and_then(Value::as_f64),
            maximum: definition.get("maximum").and_then(Value::as_f64),
            exclusive_minimum: false,
            exclusive_maximum: false,
            multiple_of: definition
                .get("multipleOf")
                .and_then(Value::as_f64)
                .filter(|m| *m > 0.0),
        };

        match definition.get("exclusiveMinimum") {
            Some(Value::Bool(b)) => constraints.exclusive_minimum = *b,
            Some(Value::Number(n)) => {
                if let Some(bound) = n.as_f64() {
                    if constraints.minimum.map(|m| bound >= m).unwrap_or(true) {
                        constraints.minimum = Some(bound);
                        constraints.exclusive_minimum = true;
                    }
                }
            }
            _ => {}
        }

        match definition.get("exclusiveMaximum") {
            Some(Value::Bool(b)) => constraints.exclusive_maximum = *b,
            Some(Value::Number(n)) => {
                if let Some(bound) = n.as_f64() {
                    if constraints.maximum.map(|m| bound <= m).unwrap_or(true) {
                        constraints.maximum = Some(bound);
                        constraints.exclusive_maximum = true;
                    }
                }
            }
            _ => {}
        }

        constraints
    }
}

fn usize_field(definition: &Value, key: &str) -> Option<usize> {
    definition
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
}

// =============================================================================
// Type Info
// =============================================================================

/// Everything an attribute knows about its values
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub name: String,
    /// A value is valid if it matches any of these
    pub types: Vec<TypeTag>,
    pub format: Option<TypeTag>,
    pub enumeration: Option<Vec<Value>>,
    pub default: Option<Value>,
    pub required: bool,
    pub constraints: Constraints,
}

impl TypeInfo {
    /// Parse type information from an attribute's definition.
    ///
    /// Malformed `type` names fail with `InvalidType`; unknown formats are ignored.
    pub fn from_definition(
        types: &TypeRegistry,
        name: &str,
        definition: &Value,
        required: bool,
    ) -> Result<Self> {
        let mut declared = types.parse_list(definition.get("type"))?;
        if declared.is_empty() {
            if definition.get("properties").is_some() {
                declared.push(TypeTag::Object);
            } else if definition.get("items").is_some() {
                declared.push(TypeTag::Array);
            }
        }

        let mut format = definition
            .get("format")
            .and_then(Value::as_str)
            .and_then(|f| {
                let tag = types.parse(f);
                if tag.is_none() {
                    debug!(attribute = name, format = f, "ignoring unknown format");
                }
                tag
            });

        let enumeration = definition.get("enum").and_then(Value::as_array).cloned();
        if enumeration.is_some() {
            format = Some(TypeTag::Enum);
        }

        Ok(Self {
            name: name.to_string(),
            types: declared,
            format,
            enumeration,
            default: definition.get("default").cloned(),
            required,
            constraints: Constraints::from_definition(definition),
        })
    }

    /// Tags used for generator lookups: the format if declared, then the types
    pub fn bias_types(&self) -> Vec<TypeTag> {
        self.format
            .iter()
            .chain(self.types.iter())
            .cloned()
            .collect()
    }

    /// Tags used for coercion; enumerated attributes also accept enum members
    pub fn coercion_types(&self) -> Vec<TypeTag> {
        let mut tags = self.types.clone();
        if self.enumeration.is_some() {
            tags.push(TypeTag::Enum);
        }
        tags
    }

    /// Coerce an explicit value to the declared types
    pub fn coerce(&self, ctx: &RenderContext, value: &Value) -> Value {
        ctx.types
            .coerce(&self.coercion_types(), value, self.enumeration.as_deref())
    }

    /// Value used when none was supplied: the explicit default, else faux data
    /// when not live, else null
    pub fn fallback(&self, ctx: &RenderContext) -> Value {
        if let Some(default) = &self.default {
            let coerced = self.coerce(ctx, default);
            return if coerced.is_null() { default.clone() } else { coerced };
        }
        if ctx.live {
            Value::Null
        } else {
            self.faux_value(ctx)
        }
    }

    /// Synthesize a value through the generator registry
    pub fn faux_value(&self, ctx: &RenderContext) -> Value {
        let bias = self.bias_types();
        for tag in &bias {
            if ctx.generators.find(tag, &self.name).is_some() {
                return ctx.generators.trigger(tag, &self.name, self);
            }
        }
        match bias.first() {
            Some(tag) => ctx.generators.trigger(tag, &self.name, self),
            None => {
                tracing::warn!(attribute = %self.name, "attribute declares no type, no faux value");
                Value::Null
            }
        }
    }
}

// =============================================================================
// Field Attribute
// =============================================================================

/// A named slot of an object schema
#[derive(Debug, Clone)]
pub enum FieldAttribute {
    Simple(TypeInfo),
    Nested(TypeInfo, Box<Schema>),
}

impl FieldAttribute {
    pub fn new(types: &TypeRegistry, name: &str, definition: &Value, required: bool) -> Result<Self> {
        debug!(attribute = name, "initializing field attribute");
        let required = required || definition.get("required") == Some(&Value::Bool(true));
        let info = TypeInfo::from_definition(types, name, definition, required)?;

        if is_nested_schema(definition) {
            let schema = Schema::build(types, definition.clone(), Some(name), required)?;
            Ok(Self::Nested(info, Box::new(schema)))
        } else {
            Ok(Self::Simple(info))
        }
    }

    pub fn info(&self) -> &TypeInfo {
        match self {
            Self::Simple(info) | Self::Nested(info, _) => info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Self::Simple(_) => None,
            Self::Nested(_, schema) => Some(schema),
        }
    }

    pub fn is_required(&self) -> bool {
        self.info().required
    }

    /// Serialize one value for this field.
    ///
    /// An explicit null is kept when `maintain_nil` is set; otherwise it is
    /// treated like an absent value.
    pub fn serialize(&self, ctx: &RenderContext, value: Option<&Value>, maintain_nil: bool) -> Result<Value> {
        let explicit_null = matches!(value, Some(Value::Null));
        if explicit_null && maintain_nil {
            return Ok(Value::Null);
        }

        match self {
            Self::Nested(_, schema) => schema.serialize(ctx, value.unwrap_or(&Value::Null)),
            Self::Simple(info) => Ok(match value {
                Some(v) if !v.is_null() => info.coerce(ctx, v),
                _ => info.fallback(ctx),
            }),
        }
    }
}

// =============================================================================
// Element Attribute
// =============================================================================

/// How array members are shaped
#[derive(Debug, Clone)]
pub enum ElementShape {
    /// Scalar members described by the attribute's own type info
    Archetype,
    /// Members are objects of a nested schema
    Nested(Box<Schema>),
}

/// Shared shape of the members of an array schema
#[derive(Debug, Clone)]
pub struct ElementAttribute {
    info: TypeInfo,
    min_items: Option<usize>,
    max_items: Option<usize>,
    unique: bool,
    shape: ElementShape,
}

impl ElementAttribute {
    /// Build from an array schema's definition (the one holding `items`)
    pub fn new(types: &TypeRegistry, name: &str, definition: &Value, required: bool) -> Result<Self> {
        debug!(attribute = name, "initializing element attribute");
        let empty = Value::Object(Default::default());
        let items = match definition.get("items") {
            Some(Value::Array(tuple)) => tuple.first().unwrap_or(&empty),
            Some(items) => items,
            None => &empty,
        };

        let array_field = |key: &str| usize_field(definition, key).or_else(|| usize_field(items, key));
        let unique = definition
            .get("uniqueItems")
            .or_else(|| items.get("uniqueItems"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let info = TypeInfo::from_definition(types, name, items, required)?;
        let shape = if items.get("properties").is_some() {
            ElementShape::Nested(Box::new(Schema::build(types, items.clone(), Some(name), false)?))
        } else {
            ElementShape::Archetype
        };

        Ok(Self {
            info,
            min_items: array_field("minItems"),
            max_items: array_field("maxItems"),
            unique,
            shape,
        })
    }

    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn shape(&self) -> &ElementShape {
        &self.shape
    }

    pub fn schema(&self) -> Option<&Schema> {
        match &self.shape {
            ElementShape::Archetype => None,
            ElementShape::Nested(schema) => Some(schema),
        }
    }

    pub fn is_archetype(&self) -> bool {
        matches!(self.shape, ElementShape::Archetype)
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Bounds for synthetic list lengths
    pub fn faux_bounds(&self, upper_limit: usize) -> (usize, usize) {
        let lower = self
            .min_items
            .unwrap_or(if self.info.required { 1 } else { 0 });
        let upper = self.max_items.unwrap_or(upper_limit).max(lower);
        (lower, upper)
    }

    /// Serialize a list of values. Without an explicit list, non-live mode
    /// synthesizes one; live mode yields an empty list.
    pub fn serialize(&self, ctx: &RenderContext, value: Option<&Value>) -> Result<Value> {
        let faux;
        let elements: &[Value] = match value {
            Some(Value::Array(elements)) => elements,
            _ if !ctx.live => {
                let (lower, upper) = self.faux_bounds(ctx.faux_array_limit);
                let length = rand::thread_rng().gen_range(lower..=upper);
                faux = vec![Value::Null; length];
                &faux
            }
            _ => &[],
        };

        let mut serialized = Vec::with_capacity(elements.len());
        for element in elements {
            let value = match &self.shape {
                ElementShape::Nested(schema) => schema.serialize(ctx, element)?,
                ElementShape::Archetype if element.is_null() => self.info.fallback(ctx),
                ElementShape::Archetype => self.info.coerce(ctx, element),
            };
            serialized.push(value);
        }

        if self.unique {
            serialized = unique_values(serialized);
        }
        Ok(Value::Array(serialized))
    }
}

/// Drop repeated values, keeping first occurrences in order
fn unique_values(values: Vec<Value>) -> Vec<Value> {
    let mut seen: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}
