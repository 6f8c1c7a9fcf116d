//! Reference Resolution
//!
//! Expands every `$ref` inside a definition into the fragment it points to,
//! producing a reference-free copy. Lookup order for a pointer:
//!
//! 1. A separately loaded definition, by exact identifier or by its
//!    `base#fragment` root document.
//! 2. A local pointer. `#/a/b` and `/a/b` are anchored at the document root;
//!    `a/b` is tried relative to each enclosing scope, innermost first.
//! 3. Nothing matched: the reference becomes an empty fragment.
//!
//! A reference that is re-entered while it is still being expanded also becomes
//! an empty fragment, so recursive definitions expand exactly one level.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::definition::{definition_id, DefinitionRegistry};

/// Reference marker key
pub const REF: &str = "$ref";

/// Resolves references against a definition registry
pub struct Resolver<'a> {
    definitions: &'a DefinitionRegistry,
}

/// A pointer target found inside some document
struct Target<'v> {
    document: &'v Value,
    path: Vec<String>,
    value: &'v Value,
}

impl<'a> Resolver<'a> {
    pub fn new(definitions: &'a DefinitionRegistry) -> Self {
        Self { definitions }
    }

    /// Return a copy of `definition` with every reference expanded
    pub fn resolve(&self, definition: &Value) -> Value {
        let mut scope = Vec::new();
        let mut active = Vec::new();
        self.walk(definition, definition, &mut scope, &mut active)
    }

    fn walk(
        &self,
        document: &Value,
        node: &Value,
        scope: &mut Vec<String>,
        active: &mut Vec<String>,
    ) -> Value {
        match node {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get(REF) {
                    return self.expand_object(document, map, reference, scope, active);
                }

                let mut resolved = Map::with_capacity(map.len());
                for (key, value) in map {
                    scope.push(key.clone());
                    resolved.insert(key.clone(), self.walk(document, value, scope, active));
                    scope.pop();
                }
                Value::Object(resolved)
            }
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    scope.push(index.to_string());
                    resolved.push(self.walk(document, item, scope, active));
                    scope.pop();
                }
                Value::Array(resolved)
            }
            other => other.clone(),
        }
    }

    /// Expand a `$ref` object, merging its sibling keys over the target
    fn expand_object(
        &self,
        document: &Value,
        map: &Map<String, Value>,
        reference: &str,
        scope: &mut Vec<String>,
        active: &mut Vec<String>,
    ) -> Value {
        let expanded = self.expand(document, reference, scope, active);

        let siblings: Vec<(&String, &Value)> = map.iter().filter(|(k, _)| *k != REF).collect();
        if siblings.is_empty() {
            return expanded;
        }

        let mut merged = match expanded {
            Value::Object(target) => target,
            _ => Map::new(),
        };
        for (key, value) in siblings {
            scope.push(key.clone());
            merged.insert(key.clone(), self.walk(document, value, scope, active));
            scope.pop();
        }
        Value::Object(merged)
    }

    fn expand(
        &self,
        document: &Value,
        reference: &str,
        scope: &[String],
        active: &mut Vec<String>,
    ) -> Value {
        let target = self
            .find_foreign(reference)
            .or_else(|| find_local(document, reference, scope));

        let Some(target) = target else {
            warn!(reference, scope = %scope.join("/"), "unresolved reference, using empty fragment");
            return Value::Object(Map::new());
        };

        let key = format!(
            "{}#/{}",
            definition_id(target.document).unwrap_or_default(),
            target.path.join("/")
        );
        if active.contains(&key) {
            warn!(reference, "recursive reference, expanding as empty fragment");
            return Value::Object(Map::new());
        }

        debug!(reference, target = %key, "resolved reference");
        active.push(key);
        let mut path = target.path;
        let resolved = self.walk(target.document, target.value, &mut path, active);
        active.pop();
        resolved
    }

    /// Look `reference` up among separately loaded definitions
    fn find_foreign(&self, reference: &str) -> Option<Target<'a>> {
        if let Some(document) = self.definitions.get(reference) {
            return Some(Target {
                document,
                path: Vec::new(),
                value: document,
            });
        }

        let (base, fragment) = reference.split_once('#')?;
        if base.is_empty() {
            return None;
        }

        let document = self
            .definitions
            .get(base)
            .or_else(|| self.definitions.get(&format!("{}#", base)))
            .or_else(|| self.definitions.find_by_prefix(base).map(|(_, d)| d))?;

        let path = pointer_tokens(fragment);
        let value = lookup(document, &path)?;
        Some(Target {
            document,
            path,
            value,
        })
    }
}

/// Resolve a pointer within `document`, closest scope first for relative pointers
fn find_local<'v>(document: &'v Value, reference: &str, scope: &[String]) -> Option<Target<'v>> {
    let pointer = reference.strip_prefix('#').unwrap_or(reference);
    let tokens = pointer_tokens(pointer);

    if pointer.is_empty() || pointer.starts_with('/') {
        let value = lookup(document, &tokens)?;
        return Some(Target {
            document,
            path: tokens,
            value,
        });
    }

    (0..=scope.len()).rev().find_map(|depth| {
        let mut path: Vec<String> = scope[..depth].to_vec();
        path.extend(tokens.iter().cloned());
        lookup(document, &path).map(|value| Target {
            document,
            path,
            value,
        })
    })
}

/// Split a JSON pointer into unescaped tokens
fn pointer_tokens(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .filter(|token| !token.is_empty())
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn lookup<'v>(document: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(document, |node, token| match node {
        Value::Object(map) => map.get(token),
        Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
