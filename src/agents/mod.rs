//! Data analysis agent
//!
//! Turns a natural-language request into reasoning service calls interleaved
//! with tool dispatch against the analysed database.
//!
//! ## Architecture
//!
//! - `domain/` - Core types (Message, MessageHistory, Session, ToolCall)
//! - `llm/` - Reasoning service clients
//! - `tools/` - Tool registry and built-in tools
//! - `core/` - Orchestration loop and system prompt
//! - `memory/` - Persisted session log

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod llm;
pub mod memory;
pub mod tools;

// Re-export commonly used types
pub use config::*;
pub use domain::*;
pub use error::*;
