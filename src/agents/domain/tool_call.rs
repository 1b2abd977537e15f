//! Tool call types for agent interactions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Message;

/// A tool call proposed by the reasoning service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the reasoning service
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Arguments passed to the tool (as JSON)
    ///
    /// Argument text that is not valid JSON is kept verbatim as a JSON string
    /// so dispatch can report it.
    pub arguments: Value,
    /// Argument text exactly as the reasoning service sent it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_arguments: Option<String>,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            raw_arguments: None,
        }
    }

    /// Build a call from the argument text received on the wire
    ///
    /// The text is kept so the call is replayed byte for byte.
    pub fn from_wire(id: impl Into<String>, name: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            id: id.into(),
            name: name.into(),
            arguments: Self::parse_arguments(&raw),
            raw_arguments: Some(raw),
        }
    }

    /// Argument text to send back to the reasoning service
    pub fn arguments_text(&self) -> String {
        match &self.raw_arguments {
            Some(raw) => raw.clone(),
            None => serde_json::to_string(&self.arguments).unwrap_or_default(),
        }
    }

    /// Parse the raw argument text sent by the reasoning service
    pub fn parse_arguments(raw: &str) -> Value {
        if raw.trim().is_empty() {
            return Value::Object(Default::default());
        }
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }
}

/// Result of dispatching one tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// ID of the tool call this is responding to
    pub tool_call_id: String,
    /// Name of the tool that was called
    pub tool_name: String,
    /// Arguments that were passed
    pub arguments: Value,
    /// Content handed back to the reasoning service
    pub content: String,
    /// Whether the tool execution succeeded
    pub success: bool,
    /// Error message if execution failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl ToolCallResult {
    /// Create a successful tool call result
    pub fn success(call: &ToolCall, content: String, execution_time_ms: u64) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            content,
            success: true,
            error: None,
            execution_time_ms,
        }
    }

    /// Create a failed tool call result; the error text becomes the content
    pub fn failure(call: &ToolCall, error: String, execution_time_ms: u64) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            content: format!("Error: {}", error),
            success: false,
            error: Some(error),
            execution_time_ms,
        }
    }

    /// The tool turn recorded in the history
    pub fn to_message(&self) -> Message {
        Message::tool_result(&self.tool_call_id, &self.tool_name, &self.content)
    }
}

/// Tool advertised to the reasoning service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema defining the tool's parameters
    pub parameters: Value,
}

impl ToolDescriptor {
    /// Create a new tool descriptor
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
