//! OpenAI-compatible chat completions client
//!
//! Works against any gateway speaking the `chat/completions` dialect with
//! function tools (OpenAI, Groq, vLLM, LiteLLM and similar).

use std::collections::HashSet;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{FinishReason, ReasoningClient, ReasoningReply, TokenUsage};
use crate::agents::config::ReasoningConfig;
use crate::agents::domain::{Message, Role, ToolCall, ToolDescriptor};
use crate::agents::error::{AgentError, AgentResult, TransportError, TransportResult};

/// OpenAI-compatible reasoning client
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiClient {
    /// Create a new client from configuration, resolving the API key
    pub fn new(config: &ReasoningConfig) -> AgentResult<Self> {
        let api_key = config.resolve_api_key()?;
        Self::with_api_key(config, api_key)
    }

    /// Create a new client with an explicit API key
    pub fn with_api_key(config: &ReasoningConfig, api_key: SecretString) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AgentError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for the chat completions API
    fn build_request_body(&self, history: &[Message], tools: &[ToolDescriptor]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": convert_messages(history),
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = json!(temp);
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        if !tools.is_empty() {
            body["tools"] = json!(tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": normalize_parameters(&t.parameters),
                        }
                    })
                })
                .collect::<Vec<_>>());
        }

        body
    }
}

/// Function parameters must at minimum be `{"type": "object"}`
fn normalize_parameters(parameters: &Value) -> Value {
    match parameters.as_object() {
        None => json!({ "type": "object", "properties": {}, "required": [] }),
        Some(obj) if obj.is_empty() => json!({ "type": "object", "properties": {}, "required": [] }),
        Some(obj) if !obj.contains_key("type") => {
            let mut p = parameters.clone();
            p["type"] = json!("object");
            p
        }
        Some(_) => parameters.clone(),
    }
}

/// Convert internal messages to the wire format
fn convert_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let mut msg = json!({
                "role": match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                },
                "content": m.content,
            });

            if m.has_tool_calls() {
                if m.content.is_empty() {
                    msg["content"] = Value::Null;
                }
                msg["tool_calls"] = json!(m
                    .tool_calls()
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments_text(),
                            }
                        })
                    })
                    .collect::<Vec<_>>());
            }

            if let Some(tool_call_id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(tool_call_id);
            }

            if let Some(name) = &m.name {
                msg["name"] = json!(name);
            }

            msg
        })
        .collect()
}

/// Parse a chat completions response
fn parse_response(response: OpenAiResponse) -> TransportResult<ReasoningReply> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::Parse("No choices in response".to_string()))?;

    let wire_calls = choice.message.tool_calls.unwrap_or_default();
    let mut seen = HashSet::new();
    let mut tool_calls = Vec::with_capacity(wire_calls.len());
    for tc in wire_calls {
        if !seen.insert(tc.id.clone()) {
            return Err(TransportError::Parse(format!(
                "Duplicate tool call id '{}' in response",
                tc.id
            )));
        }
        tool_calls.push(ToolCall::from_wire(tc.id, tc.function.name, tc.function.arguments));
    }

    let content = choice.message.content.unwrap_or_default();
    let message = Message::assistant_with_tools(content, tool_calls);

    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ReasoningReply {
        message,
        finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
        usage,
    })
}

#[async_trait]
impl ReasoningClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> TransportResult<ReasoningReply> {
        let body = self.build_request_body(history, tools);

        tracing::debug!(
            model = %self.model,
            messages = history.len(),
            tools = tools.len(),
            "Sending request to reasoning service"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Reasoning service error: {}", error_text);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let text = response.text().await?;
        let parsed: OpenAiResponse = serde_json::from_str(&text)
            .map_err(|e| TransportError::Parse(format!("Failed to parse response: {}", e)))?;

        let reply = parse_response(parsed)?;
        if let Some(usage) = &reply.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Reasoning service usage"
            );
        }
        Ok(reply)
    }
}

// Chat completions response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        let config = ReasoningConfig {
            base_url: "http://localhost:9/v1/".to_string(),
            model: "test-model".to_string(),
            temperature: Some(0.0),
            ..Default::default()
        };
        OpenAiClient::with_api_key(&config, SecretString::from("sk-test".to_string())).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().base_url, "http://localhost:9/v1");
    }

    #[test]
    fn test_request_body_carries_history_and_tools() {
        let history = vec![
            Message::system("sys"),
            Message::user("q"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new("call_1", "describe_table", json!({"table_name": "orders"}))],
            ),
            Message::tool_result("call_1", "describe_table", "id(integer)"),
        ];
        let tools = vec![ToolDescriptor::new("list_tables", "List tables", json!({}))];

        let body = client().build_request_body(&history, &tools);

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"].as_array().unwrap().len(), 4);
        assert_eq!(body["messages"][2]["content"], Value::Null);
        assert_eq!(
            body["messages"][2]["tool_calls"][0]["function"]["arguments"],
            "{\"table_name\":\"orders\"}"
        );
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(body["messages"][3]["name"], "describe_table");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_no_tools_key_when_registry_empty() {
        let body = client().build_request_body(&[Message::user("q")], &[]);
        assert!(body.get("tools").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_wire_arguments_are_replayed_verbatim() {
        let history = vec![Message::assistant_with_tools(
            "",
            vec![
                ToolCall::from_wire("call_1", "query_db", "\"abc\""),
                ToolCall::from_wire("call_2", "query_db", "{oops"),
                ToolCall::new("call_3", "list_tables", json!({"a": 1})),
            ],
        )];
        let body = client().build_request_body(&history, &[]);
        let calls = &body["messages"][0]["tool_calls"];

        assert_eq!(calls[0]["function"]["arguments"], "\"abc\"");
        assert_eq!(calls[1]["function"]["arguments"], "{oops");
        assert_eq!(calls[2]["function"]["arguments"], "{\"a\":1}");
    }

    #[test]
    fn test_parse_response_with_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function", "function": {"name": "list_tables", "arguments": "{}"}},
                        {"id": "call_b", "type": "function", "function": {"name": "query_db", "arguments": "not json"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let parsed: OpenAiResponse = serde_json::from_value(raw).unwrap();
        let reply = parse_response(parsed).unwrap();

        assert_eq!(reply.finish_reason, FinishReason::ToolCalls);
        assert_eq!(reply.content(), "");
        assert_eq!(reply.tool_calls().len(), 2);
        assert_eq!(reply.tool_calls()[0].arguments, json!({}));
        assert_eq!(reply.tool_calls()[1].arguments, json!("not json"));
        assert_eq!(reply.usage.map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn test_parse_response_rejects_duplicate_ids() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function", "function": {"name": "list_tables", "arguments": "{}"}},
                        {"id": "call_a", "type": "function", "function": {"name": "list_tables", "arguments": "{}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let parsed: OpenAiResponse = serde_json::from_value(raw).unwrap();
        match parse_response(parsed) {
            Err(TransportError::Parse(msg)) => assert!(msg.contains("call_a")),
            other => panic!("expected parse error, got {:?}", other.map(|r| r.finish_reason)),
        }
    }

    #[test]
    fn test_parse_response_without_choices() {
        let parsed: OpenAiResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(parse_response(parsed), Err(TransportError::Parse(_))));
    }
}
