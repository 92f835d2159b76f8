//! Error types for memo-tune.

use std::path::PathBuf;

/// Top-level error type for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

impl Error {
    /// The HTTP response body carried by a failed completion call, if any.
    ///
    /// The top level prints this in place of the generic message since the
    /// provider's body usually names the actual problem (bad key, quota).
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Error::Llm(LlmError::Api { body, .. })
            | Error::Pipeline(PipelineError::Llm(LlmError::Api { body, .. })) => Some(body.as_str()),
            _ => None,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors reading the transaction export.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed TSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row on line {line} has {found} columns, expected {expected}")]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Row on line {line} has a non-integer amount: {value:?}")]
    InvalidAmount { line: u64, value: String },
}

/// Record store persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Completion provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Memo does not start with an emoji followed by text: {memo:?}")]
    EmojiMismatch { memo: String },

    #[error("Classification worker failed: {0}")]
    Worker(String),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for memo-tune.
pub type Result<T> = std::result::Result<T, Error>;
