// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner errors.

use ordoplay_texture_graph::{ConnectError, EvaluationError, ParameterError, SettingsError};

/// Everything that can stop a run
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Bad command line
    #[error("{0}")]
    Usage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed script
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Script written by a newer version
    #[error("Script version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },

    /// Settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Two nodes share a key
    #[error("Duplicate node key '{0}'")]
    DuplicateKey(String),

    /// A key does not name a node
    #[error("Unknown node key '{0}'")]
    UnknownNode(String),

    /// A kind is not in the registry
    #[error("Node '{key}' has unknown kind '{kind}'")]
    UnknownKind {
        /// Node key
        key: String,
        /// Requested kind
        kind: String,
    },

    /// A parameter or input default was rejected
    #[error("Node '{key}': {source}")]
    Parameter {
        /// Node key
        key: String,
        /// Underlying error
        source: ParameterError,
    },

    /// A connection was rejected
    #[error("Cannot connect {from} -> {to}: {source}")]
    Connect {
        /// Source endpoint
        from: String,
        /// Target endpoint
        to: String,
        /// Underlying error
        source: ConnectError,
    },

    /// A pass failed as a whole
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

/// Result type for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;
