//! Error types for the analysis agent
//!
//! Only [`AgentError`] ever aborts a session, and of its variants only
//! `Memory` is absorbed by the loop. Tool failures of every kind are
//! turned into tool-turn content by the registry and fed back to the
//! reasoning service.

use std::time::Duration;

use thiserror::Error;

use crate::persistence::{QueryError, SchemaError};

/// Errors surfaced by the agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or invalid configuration, detected before any session starts
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The reasoning service could not be reached or answered badly
    #[error("Reasoning service error: {0}")]
    Transport(#[from] TransportError),

    /// An append would break the message history ordering rules
    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    /// Session log could not be read or written; logged, never fatal to a session
    #[error("Memory error: {0}")]
    Memory(String),
}

/// Errors raised while talking to the reasoning service
#[derive(Debug, Error)]
pub enum TransportError {
    /// Non-success HTTP status
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// Timeout
    #[error("Request timed out")]
    Timeout,

    /// Connection or protocol failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Network(format!("Connection error: {}", err))
        } else if err.is_decode() {
            TransportError::Parse(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Errors raised by tool registration and dispatch
#[derive(Debug, Error)]
pub enum ToolError {
    /// No handler bound to the requested name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments did not match the declared parameter shape
    #[error("Invalid arguments for {tool}: {reason}")]
    Argument { tool: String, reason: String },

    /// A handler with this name is already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Chart type outside bar, line and scatter
    #[error("Unsupported plot type: {0}. Supported types are bar, line and scatter")]
    UnsupportedPlotType(String),

    /// Schema introspection failed
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// SQL execution failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Handler did not finish within the configured bound
    #[error("Tool {tool} timed out after {elapsed:?}")]
    Timeout { tool: String, elapsed: Duration },

    /// Handler panicked
    #[error("Tool {tool} panicked: {message}")]
    Panicked { tool: String, message: String },

    /// Any other handler failure
    #[error("Tool execution error: {0}")]
    Execution(String),
}

impl ToolError {
    pub fn argument(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::Argument {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Memory(format!("Serialization error: {}", err))
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::Execution(format!("IO error: {}", err))
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for reasoning transport
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type alias for tool handlers
pub type ToolResult<T> = Result<T, ToolError>;
