//! Error types for schema resolution, serialization and graph rendering

use thiserror::Error;

/// Result type for render operations
pub type Result<T> = std::result::Result<T, RenderError>;

/// Render errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Definition not found: {id}")]
    DefinitionNotFound { id: String },

    #[error("Definition has no identifier (expected an `id` or `$id` string): {definition}")]
    DefinitionMissingId { definition: String },

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Schema {schema} requires `{name}`, which is not one of its properties")]
    InvalidRequire { schema: String, name: String },

    #[error("Malformed generator for pattern `{pattern}`: {reason}")]
    MalformedGenerator { pattern: String, reason: String },

    #[error("No value for endpoint key(s) {} found in config or relationships", .keys.join(", "))]
    EndpointKeyNotFound { keys: Vec<String> },

    #[error("Could not reach {endpoint} because {response}")]
    RequestError { endpoint: String, response: String },

    #[error("Could not parse {body:?} from {endpoint}")]
    InvalidResponse { endpoint: String, body: String },

    #[error("Invalid definition file {path}: {reason}")]
    InvalidDefinition { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_error_lists_every_key() {
        let err = RenderError::EndpointKeyNotFound {
            keys: vec!["id".to_string(), "secret".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No value for endpoint key(s) id, secret found in config or relationships"
        );
    }
}
