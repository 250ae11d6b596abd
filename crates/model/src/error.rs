use pomtree_core::ConfigError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort tree construction.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Root descriptor does not exist: {0}")]
    RootDescriptorMissing(PathBuf),

    #[error("Module cycle detected: {path} is already being aggregated")]
    ModuleCycle { path: PathBuf },

    #[error("Module nesting at {path} exceeds the depth limit of {limit}")]
    DepthExceeded { path: PathBuf, limit: usize },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Reasons a single descriptor degraded to empty content.
///
/// These never abort a build; the tree keeps them next to the degraded node.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExtractError {
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Descriptor {path} is {size} bytes, limit is {limit}")]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: usize,
    },

    #[error("Malformed descriptor: {0}")]
    Parse(String),

    #[error("Root element is <{0}>, expected <project>")]
    UnexpectedRoot(String),
}
