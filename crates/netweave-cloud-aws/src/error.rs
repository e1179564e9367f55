//! AWS provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("aws CLI not found. Please install: brew install awscli")]
    AwsCliNotFound,

    #[error("aws authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("aws command failed: {0}")]
    CommandFailed(String),

    #[error("No image matched the configured filters: {0}")]
    ImageNotFound(String),

    #[error("Declaration {0} is missing argument {1}")]
    MissingArgument(String, String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] netweave_cloud::CloudError),

    #[error("Topology error: {0}")]
    TopologyError(#[from] netweave_core::TopologyError),
}

pub type Result<T> = std::result::Result<T, AwsError>;
