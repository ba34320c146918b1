use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::info;

use crate::config::LlmConfig;
use crate::tools::ToolDefinition;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid LLM response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("LLM response contained no choices")]
    EmptyResponse,
    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
}

/// A chat model that can answer with text or with tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AssistantTurn, LlmError>;
}

/// Message in an OpenAI-style chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_empty"
    )]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    pub fn assistant(turn: &AssistantTurn) -> Self {
        Self {
            role: "assistant".to_string(),
            content: turn.content.clone(),
            tool_calls: turn.tool_calls.clone(),
            tool_call_id: None,
        }
    }

    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, as sent by the model
    pub arguments: String,
}

/// One assistant reply: text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct ToolSpec<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChatMessage,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

// Some providers send `"tool_calls": null` on plain text replies.
fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ToolCall>, D::Error> {
    Ok(Option::<Vec<ToolCall>>::deserialize(d)?.unwrap_or_default())
}

fn function_type() -> String {
    "function".to_string()
}

/// LLM client for an OpenAI-compatible chat completions endpoint (OpenRouter)
pub struct LLMClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl LLMClient {
    /// Create a new LLM client
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
        })
    }

    /// Create a client from config, reading the key from the configured
    /// environment variable
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(
            &config.base_url,
            &api_key,
            &config.model,
            config.max_tokens,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl ChatModel for LLMClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AssistantTurn, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages,
            tools: tools
                .iter()
                .map(|function| ToolSpec {
                    tool_type: "function",
                    function,
                })
                .collect(),
        };

        info!(
            model = %self.model,
            messages = messages.len(),
            "sending LLM request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|err| err.error)
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_response(&body, &self.model)
    }
}

fn parse_response(body: &str, requested_model: &str) -> Result<AssistantTurn, LlmError> {
    let chat_response: ChatResponse = serde_json::from_str(body)?;
    let usage = chat_response.usage.unwrap_or_default();

    info!(
        model = %chat_response.model.as_deref().unwrap_or(requested_model),
        input_tokens = usage.prompt_tokens,
        output_tokens = usage.completion_tokens,
        "LLM response received"
    );

    let message = chat_response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?
        .message;

    Ok(AssistantTurn {
        content: message.content,
        tool_calls: message.tool_calls,
    })
}
