//! Dotted path lookup into rendered output
//!
//! `get_path(&output, "film.director.0.name")` walks maps by key and lists by
//! numeric index.

use serde_json::{Map, Value};

/// Path segment separator
pub const SEPARATOR: char = '.';

/// Look up a dotted path; an empty path returns `value` itself
pub fn get_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    segments(path).try_fold(value, step)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

fn step<'v>(node: &'v Value, segment: &str) -> Option<&'v Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Path lookup on JSON values and maps
pub trait ValuePath {
    fn get_path(&self, path: &str) -> Option<&Value>;

    /// String at `path`
    fn get_path_str(&self, path: &str) -> Option<&str> {
        self.get_path(path).and_then(Value::as_str)
    }
}

impl ValuePath for Value {
    fn get_path(&self, path: &str) -> Option<&Value> {
        get_path(self, path)
    }
}

impl ValuePath for Map<String, Value> {
    fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = segments(path);
        let first = parts.next()?;
        parts.try_fold(self.get(first)?, step)
    }
}
