//! Endpoint Templates
//!
//! Endpoints are URL templates with two placeholder styles:
//!
//! - `{name}` anywhere in the URL, replaced by the value
//! - legacy `:name` in the path (replaced by the value) or the query
//!   (replaced by `name=value`)
//!
//! Values come from an ordered list of variable sources. Every placeholder must
//! resolve; all unresolved names are reported together. Values placed in the
//! path or query are percent-encoded.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::error::{RenderError, Result};

fn brace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid brace pattern"))
}

fn legacy_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r":([A-Za-z_]\w*)").expect("valid legacy pattern"))
}

/// Byte ranges of a URL's path and query
struct Sections {
    path: (usize, usize),
    query: Option<(usize, usize)>,
}

impl Sections {
    fn of(url: &str) -> Self {
        let fragment = url.find('#').unwrap_or(url.len());
        let query_start = url[..fragment].find('?');
        let path_end = query_start.unwrap_or(fragment);

        let path_start = match url.find("://") {
            Some(scheme_end) => {
                let authority = scheme_end + 3;
                url[authority..path_end]
                    .find('/')
                    .map(|i| authority + i)
                    .unwrap_or(path_end)
            }
            None => 0,
        };

        Self {
            path: (path_start, path_end),
            query: query_start.map(|q| (q + 1, fragment)),
        }
    }
}

/// A raw endpoint template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointTemplate {
    raw: String,
}

impl EndpointTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Placeholder names in order of first appearance
    pub fn params(&self) -> Vec<String> {
        let mut params: Vec<String> = Vec::new();
        for slot in self.placeholders() {
            if !params.iter().any(|name| *name == slot.name) {
                params.push(slot.name.to_string());
            }
        }
        params
    }

    /// Expand the template, looking each name up in `sources` in order.
    /// A null value counts as missing. Values are percent-encoded outside the
    /// authority, and substituted text is never expanded again.
    pub fn expand(&self, sources: &[&Map<String, Value>]) -> Result<String> {
        let lookup = |name: &str| -> Option<String> {
            sources
                .iter()
                .find_map(|source| source.get(name).filter(|v| !v.is_null()))
                .map(|value| match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        };

        let slots = self.placeholders();
        let mut missing: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::with_capacity(slots.len());
        for slot in &slots {
            match lookup(slot.name) {
                Some(value) => values.push(value),
                None => {
                    if !missing.iter().any(|name| name == slot.name) {
                        missing.push(slot.name.to_string());
                    }
                }
            }
        }
        if !missing.is_empty() {
            return Err(RenderError::EndpointKeyNotFound { keys: missing });
        }

        let mut expanded = String::with_capacity(self.raw.len());
        let mut cursor = 0;
        for (slot, value) in slots.iter().zip(&values) {
            expanded.push_str(&self.raw[cursor..slot.start]);
            match slot.kind {
                SlotKind::Verbatim => expanded.push_str(value),
                SlotKind::Encoded => expanded.push_str(&urlencoding::encode(value)),
                SlotKind::Pair => {
                    expanded.push_str(slot.name);
                    expanded.push('=');
                    expanded.push_str(&urlencoding::encode(value));
                }
            }
            cursor = slot.end;
        }
        expanded.push_str(&self.raw[cursor..]);

        Ok(expanded)
    }

    /// Every placeholder in the raw template, by position, without overlaps
    fn placeholders(&self) -> Vec<Slot<'_>> {
        let sections = Sections::of(&self.raw);
        let (path_start, _) = sections.path;

        let mut slots: Vec<Slot<'_>> = brace_pattern()
            .captures_iter(&self.raw)
            .filter_map(|c| {
                let whole = c.get(0)?;
                let name = c.get(1)?;
                Some(Slot {
                    start: whole.start(),
                    end: whole.end(),
                    name: name.as_str(),
                    kind: if whole.start() < path_start {
                        SlotKind::Verbatim
                    } else {
                        SlotKind::Encoded
                    },
                })
            })
            .collect();

        let legacy = std::iter::once((sections.path, SlotKind::Encoded))
            .chain(sections.query.map(|query| (query, SlotKind::Pair)));
        for ((start, end), kind) in legacy {
            for c in legacy_pattern().captures_iter(&self.raw[start..end]) {
                if let (Some(whole), Some(name)) = (c.get(0), c.get(1)) {
                    slots.push(Slot {
                        start: start + whole.start(),
                        end: start + whole.end(),
                        name: name.as_str(),
                        kind,
                    });
                }
            }
        }

        slots.sort_by_key(|slot| slot.start);
        let mut cursor = 0;
        slots.retain(|slot| {
            let keep = slot.start >= cursor;
            if keep {
                cursor = slot.end;
            }
            keep
        });
        slots
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    /// `{name}` in the authority, substituted as is
    Verbatim,
    /// Replaced by the encoded value
    Encoded,
    /// Legacy query placeholder, replaced by `name=value`
    Pair,
}

/// One placeholder occurrence in a template
struct Slot<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    kind: SlotKind,
}

impl From<&str> for EndpointTemplate {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
