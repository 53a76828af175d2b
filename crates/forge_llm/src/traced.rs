//! Logging decorator for model calls.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use crate::client::LlmClient;
use crate::error::LlmResult;
use crate::types::{ChatMessage, ChatResponse, StructuredRequest, ToolSpec};

/// Wraps a client and logs the start, end and failure of every call.
#[derive(Clone)]
pub struct TracedLlm {
    inner: Arc<dyn LlmClient>,
}

impl TracedLlm {
    pub fn new(inner: Arc<dyn LlmClient>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<dyn LlmClient> {
        &self.inner
    }
}

#[async_trait]
impl LlmClient for TracedLlm {
    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn structured(&self, request: StructuredRequest) -> LlmResult<Option<Value>> {
        let name = request.name.clone();
        let method = request.method;
        info!(
            model = self.model(),
            output = %name,
            ?method,
            messages = request.messages.len(),
            "LLM START"
        );

        let start = Instant::now();
        let result = self.inner.structured(request).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(value) => info!(
                output = %name,
                elapsed_ms,
                produced = value.is_some(),
                "LLM END"
            ),
            Err(e) => error!(output = %name, elapsed_ms, "LLM ERROR: {}", e),
        }
        result
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> LlmResult<ChatResponse> {
        info!(
            model = self.model(),
            messages = messages.len(),
            tools = tools.len(),
            "LLM START"
        );

        let start = Instant::now();
        let result = self.inner.chat(messages, tools).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(resp) => info!(
                elapsed_ms,
                tool_calls = resp.tool_calls.len(),
                input_tokens = resp.usage.input_tokens,
                output_tokens = resp.usage.output_tokens,
                "LLM END"
            ),
            Err(e) => error!(elapsed_ms, "LLM ERROR: {}", e),
        }
        result
    }
}
