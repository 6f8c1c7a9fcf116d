//! Generator Registry
//!
//! Generators synthesize faux values for attributes when no live value is
//! available. Each generator applies to one [`TypeTag`] and to attribute names
//! matching its pattern. Registrations are kept newest-first, so a generator
//! registered later shadows earlier ones for the same tag and name.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::attribute::TypeInfo;
use crate::error::{RenderError, Result};
use crate::faux;
use crate::types::TypeTag;

/// Value-producing algorithm; `None` is rendered as null
pub type Algorithm = Arc<dyn Fn(&TypeInfo) -> Option<Value> + Send + Sync>;

/// A (type, name pattern, algorithm) triple
#[derive(Clone)]
pub struct Generator {
    tag: TypeTag,
    pattern: Regex,
    algorithm: Algorithm,
}

impl Generator {
    /// Create a generator; an invalid name pattern is a `MalformedGenerator`
    pub fn new<F>(tag: TypeTag, pattern: &str, algorithm: F) -> Result<Self>
    where
        F: Fn(&TypeInfo) -> Option<Value> + Send + Sync + 'static,
    {
        let pattern = Regex::new(pattern).map_err(|e| RenderError::MalformedGenerator {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            tag,
            pattern,
            algorithm: Arc::new(algorithm),
        })
    }

    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Does this generator apply to `tag` and the attribute name or context?
    pub fn matches(&self, tag: &TypeTag, context: &str) -> bool {
        self.tag == *tag && self.pattern.is_match(context)
    }

    /// Run the algorithm for an attribute
    pub fn trigger(&self, info: &TypeInfo) -> Value {
        (self.algorithm)(info).unwrap_or(Value::Null)
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("tag", &self.tag)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Newest-first generator stack
#[derive(Debug, Clone)]
pub struct GeneratorRegistry {
    generators: Vec<Generator>,
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl GeneratorRegistry {
    /// A registry with no generators
    pub fn empty() -> Self {
        Self {
            generators: Vec::new(),
        }
    }

    /// A registry with built-in generators for every standard type and format
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        faux::register_builtins(&mut registry);
        registry
    }

    /// Register an algorithm for a type and name pattern
    pub fn register<F>(&mut self, tag: TypeTag, pattern: &str, algorithm: F) -> Result<()>
    where
        F: Fn(&TypeInfo) -> Option<Value> + Send + Sync + 'static,
    {
        self.add(Generator::new(tag, pattern, algorithm)?);
        Ok(())
    }

    /// Push an already-built generator on top of the stack
    pub fn add(&mut self, generator: Generator) {
        self.generators.insert(0, generator);
    }

    /// Newest generator applying to `tag` and `context`
    pub fn find(&self, tag: &TypeTag, context: &str) -> Option<&Generator> {
        self.generators.iter().find(|g| g.matches(tag, context))
    }

    /// Generate a value, or null (with a diagnostic) if no generator applies
    pub fn trigger(&self, tag: &TypeTag, context: &str, info: &TypeInfo) -> Value {
        match self.find(tag, context) {
            Some(generator) => generator.trigger(info),
            None => {
                warn!(%tag, context, "no generator found, rendering null");
                Value::Null
            }
        }
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}
