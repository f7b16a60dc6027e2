//! Error types for schema loading and graph compilation

use thiserror::Error;

/// Result type for schema-flow operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Schema-flow errors
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Failed to load schemas from {source_name}: {message}")]
    Load { source_name: String, message: String },

    #[error("Schema name registered twice: {0}")]
    DuplicateName(String),

    #[error("Unknown reference {reference:?} in definition of {within}")]
    UnknownReference { reference: String, within: String },

    #[error("Recursive reference chain through {0}")]
    RecursiveReference(String),

    #[error("Unknown schema kind {kind:?} in definition of {within}")]
    UnknownKind { kind: String, within: String },

    #[error("Invalid definition for {within}: {message}")]
    InvalidDefinition { within: String, message: String },

    #[error("Invalid type string at offset {offset} in {input:?}: {message}")]
    TypeString {
        input: String,
        offset: usize,
        message: String,
    },

    #[error("Root schema must be an object, got {kind}")]
    RootNotObject { kind: String },

    #[error("Nesting depth limit of {limit} exceeded below {node}")]
    DepthLimitExceeded { node: String, limit: usize },

    #[error("Unknown bundled example: {0}")]
    UnknownExample(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
