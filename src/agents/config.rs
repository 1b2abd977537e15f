//! Configuration types for the analysis agent

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::error::{AgentError, AgentResult};

/// Orchestration loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Maximum number of tool dispatch rounds per user request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Bound on a single tool handler invocation
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_seconds: u64,
    /// Dispatch the calls of one batch concurrently
    #[serde(default = "default_true")]
    pub parallel_tool_calls: bool,
    /// Append a schema snapshot to the system prompt at session start
    #[serde(default = "default_true")]
    pub include_schema_in_prompt: bool,
    /// Rows sampled per table for schema context
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
    /// Tera template replacing the built-in system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tool_timeout_seconds: default_tool_timeout(),
            parallel_tool_calls: true,
            include_schema_in_prompt: true,
            sample_rows: default_sample_rows(),
            system_prompt: None,
        }
    }
}

impl AgentConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_seconds)
    }
}

fn default_max_iterations() -> u32 {
    5
}

fn default_tool_timeout() -> u64 {
    60
}

fn default_sample_rows() -> usize {
    3
}

fn default_true() -> bool {
    true
}

/// OpenAI-compatible reasoning service configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct ReasoningConfig {
    /// Base URL of the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name/identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Inline API key; prefer `api_key_env`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Completion token cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Per-request timeout
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            temperature: None,
            max_tokens: None,
            timeout_seconds: default_request_timeout(),
        }
    }
}

impl fmt::Debug for ReasoningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReasoningConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl ReasoningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Resolve the API key from the inline value or the environment
    pub fn resolve_api_key(&self) -> AgentResult<SecretString> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(SecretString::from(key.clone()));
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.is_empty() => Ok(SecretString::from(key)),
            _ => Err(AgentError::Configuration(format!(
                "No API key configured: set reasoning.api_key or the {} environment variable",
                self.api_key_env
            ))),
        }
    }
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

/// Persisted session log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Record requests and answers
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// JSON file holding the log
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    /// Most recent entries kept
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_history_path(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_history_path() -> PathBuf {
    PathBuf::from("chat_history.json")
}

fn default_max_entries() -> usize {
    100
}
