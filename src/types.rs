//! Type Registry
//!
//! Maps JSON type and format names onto semantic [`TypeTag`]s and coerces raw
//! values between them.
//!
//! Lookup is case-insensitive and substring tolerant: a registered name matches
//! any queried name that contains it. Names registered with the reserved
//! `render_` marker disambiguate library types from JSON-Schema names, so
//! `find("boolean")` falls back to `render_boolean` unless a caller registers
//! its own `boolean`.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::debug;

use crate::error::{RenderError, Result};

/// Reserved marker for library-specific type names
pub const RESERVED_PREFIX: &str = "render_";

// =============================================================================
// Type Tags
// =============================================================================

/// Semantic category of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    String,
    Integer,
    Float,
    Boolean,
    Uuid,
    Enum,
    DateTime,
    Date,
    Email,
    Hostname,
    Ipv4,
    Ipv6,
    Uri,
    Null,
    Object,
    Array,
    /// A caller-registered tag
    Custom(String),
}

impl TypeTag {
    /// Resolve a bare identifier (capitalized-name lookup)
    pub fn from_identifier(name: &str) -> Option<Self> {
        match capitalize(name).as_str() {
            "String" => Some(Self::String),
            "Integer" => Some(Self::Integer),
            "Float" | "Number" => Some(Self::Float),
            "Boolean" => Some(Self::Boolean),
            "Object" | "Hash" => Some(Self::Object),
            "Array" => Some(Self::Array),
            "Time" | "Datetime" => Some(Self::DateTime),
            "Null" => Some(Self::Null),
            _ => None,
        }
    }

    /// Does `value` already belong to this category?
    pub fn is_satisfied_by(&self, value: &Value, enumeration: Option<&[Value]>) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_f64(),
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Uuid => value
                .as_str()
                .map(|s| uuid::Uuid::parse_str(s).is_ok())
                .unwrap_or(false),
            Self::DateTime => value
                .as_str()
                .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            Self::Date => value
                .as_str()
                .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                .unwrap_or(false),
            Self::Email => value.as_str().map(|s| s.contains('@')).unwrap_or(false),
            Self::Hostname | Self::Uri => value.is_string(),
            Self::Ipv4 => value
                .as_str()
                .map(|s| s.parse::<Ipv4Addr>().is_ok())
                .unwrap_or(false),
            Self::Ipv6 => value
                .as_str()
                .map(|s| s.parse::<Ipv6Addr>().is_ok())
                .unwrap_or(false),
            Self::Enum => enumeration.map(|e| e.contains(value)).unwrap_or(false),
            Self::Custom(_) => true,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Uuid => "uuid",
            Self::Enum => "enum",
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Email => "email",
            Self::Hostname => "hostname",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Uri => "uri",
            Self::Null => "null",
            Self::Object => "object",
            Self::Array => "array",
            Self::Custom(name) => name,
        };
        f.write_str(name)
    }
}

fn capitalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered name → tag registrations
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    entries: Vec<(String, TypeTag)>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl TypeRegistry {
    /// An empty registry (identifier fallback still applies in `parse`)
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Registry with the standard JSON types and formats
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        // Standard types
        registry.register("number", TypeTag::Float);
        registry.register("null", TypeTag::Null);
        registry.register_reserved("enum", TypeTag::Enum);
        registry.register_reserved("boolean", TypeTag::Boolean);

        // Standard formats
        registry.register("uri", TypeTag::Uri);
        registry.register("date-time", TypeTag::DateTime);
        registry.register_reserved("ipv4", TypeTag::Ipv4);
        registry.register_reserved("ipv6", TypeTag::Ipv6);
        registry.register_reserved("email", TypeTag::Email);
        registry.register_reserved("hostname", TypeTag::Hostname);

        // Extended
        registry.register("uuid", TypeTag::Uuid);
        registry.register_reserved("date", TypeTag::Date);

        registry
    }

    /// Associate a (lowercased) name with a tag. Re-registering a name replaces
    /// its tag in place.
    pub fn register(&mut self, name: &str, tag: TypeTag) {
        let name = name.to_lowercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = tag,
            None => self.entries.push((name, tag)),
        }
    }

    fn register_reserved(&mut self, name: &str, tag: TypeTag) {
        self.register(&reserved_name(name), tag);
    }

    /// Find the tag whose registered name is contained in `name`, falling back
    /// to the reserved-marker registration.
    pub fn find(&self, name: &str) -> Option<&TypeTag> {
        self.tag_for_name(name)
            .or_else(|| self.tag_for_name(&reserved_name(name)))
    }

    fn tag_for_name(&self, name: &str) -> Option<&TypeTag> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .find(|(registered, _)| name.contains(registered.as_str()))
            .map(|(_, tag)| tag)
    }

    /// Is `name` exactly a registered or identifier type name? No substring
    /// matching, so `"security"` is not taken for `uri`.
    pub fn is_type_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        let reserved = reserved_name(name);
        self.entries
            .iter()
            .any(|(registered, _)| *registered == lower || *registered == reserved)
            || TypeTag::from_identifier(name).is_some()
    }

    /// Parse a type name, returning `None` when it cannot be resolved
    pub fn parse(&self, name: &str) -> Option<TypeTag> {
        self.find(name)
            .cloned()
            .or_else(|| TypeTag::from_identifier(name))
    }

    /// Parse a type name, failing with `InvalidType` when it cannot be resolved
    pub fn parse_strict(&self, name: &str) -> Result<TypeTag> {
        self.parse(name)
            .ok_or_else(|| RenderError::InvalidType(name.to_string()))
    }

    /// Parse a definition's `type` value: a name, a list of names, or nothing
    pub fn parse_list(&self, value: Option<&Value>) -> Result<Vec<TypeTag>> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(name)) => Ok(vec![self.parse_strict(name)?]),
            Some(Value::Array(names)) => names
                .iter()
                .map(|name| match name {
                    Value::String(name) => self.parse_strict(name),
                    other => Err(RenderError::InvalidType(other.to_string())),
                })
                .collect(),
            Some(other) => Err(RenderError::InvalidType(other.to_string())),
        }
    }

    /// Coerce `value` into one of `tags`.
    ///
    /// Values already satisfying a tag are returned unchanged; otherwise the
    /// value is converted towards the first tag.
    pub fn coerce(&self, tags: &[TypeTag], value: &Value, enumeration: Option<&[Value]>) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        let Some(first) = tags.first() else {
            return Value::Null;
        };
        if tags.iter().any(|tag| tag.is_satisfied_by(value, enumeration)) {
            return value.clone();
        }

        debug!(tag = %first, value = %value, "coercing value");
        match first {
            TypeTag::Integer => to_integer(value),
            TypeTag::Float => to_float(value),
            TypeTag::String => Value::String(stringify(value)),
            TypeTag::Boolean => match value.as_str() {
                Some("true") => Value::Bool(true),
                Some("false") => Value::Bool(false),
                _ => Value::Null,
            },
            TypeTag::Enum => {
                let wanted = stringify(value);
                enumeration
                    .unwrap_or(&[])
                    .iter()
                    .find(|candidate| **candidate == *value || stringify(candidate) == wanted)
                    .cloned()
                    .unwrap_or(Value::Null)
            }
            _ => value.clone(),
        }
    }
}

fn reserved_name(name: &str) -> String {
    format!("{}{}", RESERVED_PREFIX, name.to_lowercase())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_integer(value: &Value) -> Value {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|f| Value::from(f.trunc() as i64))
            .unwrap_or(Value::Null),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .or_else(|_| s.parse::<f64>().map(|f| Value::from(f.trunc() as i64)))
                .unwrap_or(Value::Null)
        }
        Value::Bool(b) => Value::from(*b as i64),
        _ => Value::Null,
    }
}

fn to_float(value: &Value) -> Value {
    match value {
        Value::Number(n) => n.as_f64().map(Value::from).unwrap_or(Value::Null),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_identifiers() {
        let types = TypeRegistry::standard();
        assert_eq!(types.parse("integer"), Some(TypeTag::Integer));
        assert_eq!(types.parse("string"), Some(TypeTag::String));
        assert_eq!(types.parse("object"), Some(TypeTag::Object));
        assert_eq!(types.parse("FloAt"), Some(TypeTag::Float));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let types = TypeRegistry::standard();
        for name in ["uuid", "UUID", "uUId"] {
            assert_eq!(types.parse(name), Some(TypeTag::Uuid));
        }
        assert_eq!(types.parse("number"), Some(TypeTag::Float));
        assert_eq!(types.parse("date-time"), Some(TypeTag::DateTime));
    }

    #[test]
    fn test_reserved_fallback() {
        let types = TypeRegistry::standard();
        assert_eq!(types.find("boolean"), Some(&TypeTag::Boolean));
        assert_eq!(types.find("ipv4"), Some(&TypeTag::Ipv4));
        assert_eq!(types.find("date"), Some(&TypeTag::Date));
        assert_eq!(types.find("foo"), None);
    }

    #[test]
    fn test_is_type_name_is_exact() {
        let types = TypeRegistry::standard();
        for name in ["string", "Integer", "uuid", "email", "date", "date-time"] {
            assert!(types.is_type_name(name), "{}", name);
        }
        for name in ["security", "film", "http://films.local/{id}"] {
            assert!(!types.is_type_name(name), "{}", name);
        }
        assert!(types.parse("security").is_some());
    }

    #[test]
    fn test_user_type_shadows_reserved() {
        let mut types = TypeRegistry::standard();
        types.register("boolean", TypeTag::Custom("flag".to_string()));
        assert_eq!(types.find("boolean"), Some(&TypeTag::Custom("flag".to_string())));
    }

    #[test]
    fn test_parse_strict_rejects_unknown() {
        let types = TypeRegistry::standard();
        assert!(matches!(
            types.parse_strict("NotAClass"),
            Err(RenderError::InvalidType(name)) if name == "NotAClass"
        ));
        assert_eq!(types.parse("NotAClass"), None);
    }

    #[test]
    fn test_parse_list_accepts_unions() {
        let types = TypeRegistry::standard();
        let tags = types.parse_list(Some(&json!(["string", "null"]))).unwrap();
        assert_eq!(tags, vec![TypeTag::String, TypeTag::Null]);
        assert!(types.parse_list(None).unwrap().is_empty());
    }

    #[test]
    fn test_coerce_rules() {
        let types = TypeRegistry::standard();
        assert_eq!(types.coerce(&[TypeTag::Integer], &json!("42"), None), json!(42));
        assert_eq!(types.coerce(&[TypeTag::Float], &json!("1.5"), None), json!(1.5));
        assert_eq!(types.coerce(&[TypeTag::Float], &json!(2), None), json!(2.0));
        assert_eq!(types.coerce(&[TypeTag::String], &json!(7), None), json!("7"));
        assert_eq!(types.coerce(&[TypeTag::Boolean], &json!("true"), None), json!(true));
        assert_eq!(types.coerce(&[TypeTag::Boolean], &json!("yes"), None), Value::Null);
        assert_eq!(types.coerce(&[], &json!("x"), None), Value::Null);
        assert_eq!(types.coerce(&[TypeTag::String], &Value::Null, None), Value::Null);
    }

    #[test]
    fn test_coerce_keeps_satisfying_values() {
        let types = TypeRegistry::standard();
        let tags = [TypeTag::Integer, TypeTag::String];
        assert_eq!(types.coerce(&tags, &json!("abc"), None), json!("abc"));
    }

    #[test]
    fn test_coerce_enum() {
        let types = TypeRegistry::standard();
        let allowed = vec![json!("horror"), json!("action")];
        assert_eq!(
            types.coerce(&[TypeTag::Enum], &json!("action"), Some(&allowed)),
            json!("action")
        );
        assert_eq!(
            types.coerce(&[TypeTag::Enum], &json!("drama"), Some(&allowed)),
            Value::Null
        );
    }
}
