//! Cloud declaration and provider error types

use thiserror::Error;

/// Cloud declaration and provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Duplicate resource declaration: {0}")]
    DuplicateResource(String),

    #[error("Resource {resource} references {referenced}, which is not declared yet")]
    UndeclaredReference { resource: String, referenced: String },

    #[error("No output recorded for {resource}.{attribute}")]
    UnresolvedReference { resource: String, attribute: String },

    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
