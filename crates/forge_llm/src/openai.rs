//! OpenAI chat completions client.
//!
//! Works against any endpoint that speaks the OpenAI chat completions wire
//! format, including function calling and `json_schema` response formats.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::client::{extract_json, LlmClient};
use crate::config::LlmConfig;
use crate::error::{LlmError, LlmResult};
use crate::types::{
    ChatMessage, ChatResponse, StructuredMethod, StructuredRequest, ToolCall, ToolSpec, Usage,
};

/// Client for an OpenAI-compatible endpoint.
pub struct OpenAiClient {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client; fails with [`LlmError::NotConfigured`] without an API key.
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        Self::new(LlmConfig::from_env())
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn request<'a>(&'a self, messages: &[ChatMessage]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.config.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: self.config.temperature,
            max_completion_tokens: self.config.max_tokens,
            tools: Vec::new(),
            tool_choice: None,
            response_format: None,
        }
    }

    async fn send(&self, request: &CompletionRequest<'_>) -> LlmResult<CompletionResponse> {
        let url = self.config.completions_url();
        let max_retries = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                // 2s, 4s, 8s... with the default delay
                let delay = Duration::from_millis(self.config.retry_delay_ms << attempt.min(5));
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(attempt = attempt + 1, "LLM request failed: {}", e);
                    last_error = Some(LlmError::from(e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let err = LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                };
                if err.is_transient() {
                    warn!(
                        attempt = attempt + 1,
                        max_retries, "Transient LLM API error {}", status
                    );
                    last_error = Some(err);
                    continue;
                }
                return Err(err);
            }

            let body: CompletionResponse = response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {}", e)))?;
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("max retries exceeded".to_string())))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn structured(&self, request: StructuredRequest) -> LlmResult<Option<Value>> {
        let name = function_name(&request.name);
        let mut body = self.request(&request.messages);

        match request.method {
            StructuredMethod::JsonSchema => {
                body.response_format = Some(json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": name,
                        "schema": request.schema,
                        "strict": false,
                    }
                }));
            }
            StructuredMethod::FunctionCalling => {
                body.tools = vec![WireTool::new(
                    &name,
                    &format!("Return the result as a {}", request.name),
                    request.schema,
                )];
                body.tool_choice = Some(json!({
                    "type": "function",
                    "function": { "name": name }
                }));
            }
        }

        let response = self.send(&body).await?;
        let message = first_message(response)?.0;

        if let Some(refusal) = message.refusal.as_deref().filter(|r| !r.is_empty()) {
            warn!("Model refused structured output '{}': {}", request.name, refusal);
            return Ok(None);
        }

        match request.method {
            StructuredMethod::JsonSchema => {
                let text = message.content.unwrap_or_default();
                if text.trim().is_empty() {
                    return Ok(None);
                }
                extract_json(&text).map(Some).ok_or_else(|| {
                    LlmError::decode(&request.name, "reply did not contain a JSON object")
                })
            }
            StructuredMethod::FunctionCalling => {
                let call = message
                    .tool_calls
                    .into_iter()
                    .find(|c| c.function.name == name);
                match call {
                    Some(call) => {
                        debug!("Structured output '{}' via function call", request.name);
                        Ok(Some(parse_arguments(&call.function.arguments)))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> LlmResult<ChatResponse> {
        let mut body = self.request(messages);
        body.tools = tools
            .iter()
            .map(|t| WireTool::new(&t.name, &t.description, t.parameters.clone()))
            .collect();

        let response = self.send(&body).await?;
        let (message, usage) = first_message(response)?;

        Ok(ChatResponse {
            content: message.content.filter(|c| !c.is_empty()),
            tool_calls: message
                .tool_calls
                .into_iter()
                .map(|c| ToolCall::new(c.id, c.function.name, parse_arguments(&c.function.arguments)))
                .collect(),
            usage,
        })
    }
}

fn first_message(response: CompletionResponse) -> LlmResult<(ResponseMessage, Usage)> {
    let usage = response
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    response
        .choices
        .into_iter()
        .next()
        .map(|c| (c.message, usage))
        .ok_or_else(|| LlmError::InvalidResponse("response had no choices".to_string()))
}

/// Function names are limited to `[a-zA-Z0-9_-]`.
fn function_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Tool arguments arrive as a JSON string. Empty means no arguments; text
/// that is not JSON is passed through so the tool can report it.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

// Wire types

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|c| WireToolCall {
                    id: c.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: c.name.clone(),
                        arguments: c.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

impl WireTool {
    fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
