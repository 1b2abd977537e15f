//! Reasoning service clients
//!
//! A reasoning service receives the full ordered conversation plus every tool
//! descriptor and answers with one assistant turn that may propose tool calls.
//! Clients make exactly one request per call: no retries and no streaming.

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::domain::{Message, ToolCall, ToolDescriptor};
use crate::agents::error::TransportResult;

/// Client for a remote reasoning service
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Get the model being used
    fn model(&self) -> &str;

    /// Send the conversation and tool descriptors, returning the assistant turn
    async fn send(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> TransportResult<ReasoningReply>;
}

/// One assistant turn returned by the reasoning service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningReply {
    /// Assistant message, carrying any proposed calls
    pub message: Message,
    /// Reason the completion stopped
    pub finish_reason: FinishReason,
    /// Token usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ReasoningReply {
    /// Reply without calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }

    /// Reply proposing calls
    pub fn with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            message: Message::assistant_with_tools(content, calls),
            finish_reason: FinishReason::ToolCalls,
            usage: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message.tool_calls()
    }
}

/// Reason for completion finishing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    Stop,
    /// Hit max tokens
    Length,
    /// Tool call requested
    ToolCalls,
    /// Content filtered
    ContentFilter,
}

impl FinishReason {
    fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => FinishReason::Length,
            Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
