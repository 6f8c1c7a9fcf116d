//! Definition Registry
//!
//! Stores raw schema definitions by identifier. Definitions can be loaded one at
//! a time or in bulk from a directory of JSON files.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::error::{RenderError, Result};

/// Identifier keys, in lookup order
const ID_KEYS: [&str; 2] = ["id", "$id"];

/// Return a definition's identifier, if it has one
pub fn definition_id(definition: &Value) -> Option<&str> {
    ID_KEYS
        .iter()
        .find_map(|key| definition.get(*key).and_then(Value::as_str))
}

// =============================================================================
// File Collaborator
// =============================================================================

/// Enumerates and reads definition files
pub trait DefinitionFiles {
    /// List definition files under `directory`
    fn list_files(&self, directory: &Path) -> Result<Vec<PathBuf>>;

    /// Read one definition file
    fn read_file(&self, path: &Path) -> Result<String>;
}

/// Filesystem-backed definition files
#[derive(Debug, Clone)]
pub struct FsDefinitionFiles {
    /// File extension to load
    pub extension: String,
    /// Skip files whose path (relative to the directory) starts with these prefixes
    pub skip_prefixes: Vec<String>,
}

impl Default for FsDefinitionFiles {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            skip_prefixes: vec![
                "target/".to_string(),
                ".git/".to_string(),
                "node_modules/".to_string(),
            ],
        }
    }
}

impl DefinitionFiles for FsDefinitionFiles {
    fn list_files(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(directory)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().map(|e| e != self.extension.as_str()).unwrap_or(true) {
                continue;
            }

            let relative = path.strip_prefix(directory).unwrap_or(path);
            let relative_str = relative.to_string_lossy();
            if self.skip_prefixes.iter().any(|p| relative_str.starts_with(p.as_str())) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Named schema definitions
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, Value>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition under its identifier, replacing any previous one
    pub fn load(&mut self, definition: Value) -> Result<String> {
        let id = definition_id(&definition)
            .map(str::to_string)
            .ok_or_else(|| RenderError::DefinitionMissingId {
                definition: truncate(&definition.to_string(), 120),
            })?;

        if self.definitions.insert(id.clone(), definition).is_some() {
            tracing::debug!(%id, "replaced existing definition");
        }
        Ok(id)
    }

    /// Load every definition file found under `directory`
    pub fn load_from_directory(&mut self, directory: &Path) -> Result<Vec<String>> {
        self.load_with(&FsDefinitionFiles::default(), directory)
    }

    /// Load definitions through a custom file collaborator
    pub fn load_with(&mut self, files: &dyn DefinitionFiles, directory: &Path) -> Result<Vec<String>> {
        let mut loaded = Vec::new();

        for path in files.list_files(directory)? {
            info!("Reading {} definition", path.display());
            let content = files.read_file(&path)?;
            let definition: Value = serde_json::from_str(&content).map_err(|e| {
                RenderError::InvalidDefinition {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            loaded.push(self.load(definition)?);
        }

        Ok(loaded)
    }

    /// Find a definition, failing with `DefinitionNotFound`
    pub fn find(&self, id: &str) -> Result<&Value> {
        self.get(id).ok_or_else(|| RenderError::DefinitionNotFound {
            id: id.to_string(),
        })
    }

    /// Non-raising lookup
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.definitions.get(id)
    }

    /// First definition whose identifier starts with `prefix`
    pub fn find_by_prefix(&self, prefix: &str) -> Option<(&str, &Value)> {
        let mut ids: Vec<&String> = self
            .definitions
            .keys()
            .filter(|id| id.starts_with(prefix))
            .collect();
        ids.sort();
        ids.first()
            .and_then(|id| self.definitions.get_key_value(id.as_str()))
            .map(|(id, definition)| (id.as_str(), definition))
    }

    /// All identifiers, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}
