//! Unified error types for glance.
//!
//! This module provides the error hierarchy covering:
//! - LLM provider errors (authentication, rate limiting, etc.)
//! - Tool execution errors
//! - Media intake, normalization and remote registration errors
//! - Agent runtime errors

use std::time::Duration;

use crate::media::MediaKind;

pub use crate::llms::error::LlmError;

/// Result type alias for glance operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for glance.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// LLM provider error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool execution error.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Media handling error.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Agent runtime error.
    #[error("Agent error: {0}")]
    Agent(String),

    /// Maximum steps reached during agent execution.
    #[error("Maximum steps ({max_steps}) reached without final answer")]
    MaxSteps {
        /// The maximum number of steps configured.
        max_steps: usize,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an agent error with a message.
    #[must_use]
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Create a max steps error.
    #[must_use]
    pub const fn max_steps(max_steps: usize) -> Self {
        Self::MaxSteps { max_steps }
    }
}

/// Error type for tool execution failures.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Error during tool execution.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Invalid arguments provided to the tool.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool not found.
    #[error("Tool not found: {0}")]
    NotFound(String),
}

impl ToolError {
    /// Create an execution error.
    #[must_use]
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}

/// Error type for media intake, normalization and remote registration.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum MediaError {
    /// The uploaded file's extension is not in the allowlist for its kind.
    #[error("Unsupported {kind} type {extension:?}; allowed: {allowed}")]
    UnsupportedExtension {
        /// Kind of media the upload was submitted as.
        kind: MediaKind,
        /// Extension that was rejected (lowercased, may be empty).
        extension: String,
        /// Comma separated list of accepted extensions.
        allowed: String,
    },

    /// Image bytes could not be decoded.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Normalized image could not be encoded.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Remote store reported the asset as failed.
    #[error("Remote processing of {name} failed: {message}")]
    RemoteFailed {
        /// Remote resource name.
        name: String,
        /// Reason reported by the remote store.
        message: String,
    },

    /// Remote asset did not become ready in time.
    #[error("Remote file {name} still processing after {waited:?}")]
    Timeout {
        /// Remote resource name.
        name: String,
        /// How long the caller waited.
        waited: Duration,
    },
}

impl MediaError {
    /// Create a decode error.
    #[must_use]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an encode error.
    #[must_use]
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a remote failure error.
    #[must_use]
    pub fn remote_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFailed {
            name: name.into(),
            message: message.into(),
        }
    }
}
