//! Scripted model client for tests.
//!
//! Returns queued replies in order and records every call, so pipeline
//! tests can run without network access or an API key.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::client::LlmClient;
use crate::error::{LlmError, LlmResult};
use crate::types::{ChatMessage, ChatResponse, StructuredMethod, StructuredRequest, ToolSpec};

/// Computes a chat reply from the conversation so far.
pub type ChatHandler = Arc<dyn Fn(&[ChatMessage], &[ToolSpec]) -> ChatResponse + Send + Sync>;

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    /// `"structured"` or `"chat"`.
    pub method: &'static str,
    /// Target type name for structured calls.
    pub name: Option<String>,
    pub structured_method: Option<StructuredMethod>,
    pub messages: Vec<ChatMessage>,
    /// Names of the tools offered.
    pub tools: Vec<String>,
}

impl CapturedCall {
    /// Concatenated text of every message in the call.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Mock model client.
///
/// Structured calls pop from a queue and return `None` once it runs dry.
/// Chat calls pop from their own queue, then fall back to the chat
/// handler, then to a plain `"done"` answer.
#[derive(Clone)]
pub struct MockLlm {
    model: String,
    structured: Arc<RwLock<VecDeque<Option<Value>>>>,
    chat: Arc<RwLock<VecDeque<ChatResponse>>>,
    chat_handler: Arc<RwLock<Option<ChatHandler>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            structured: Arc::new(RwLock::new(VecDeque::new())),
            chat: Arc::new(RwLock::new(VecDeque::new())),
            chat_handler: Arc::new(RwLock::new(None)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue the reply for the next structured call.
    pub fn add_structured(self, value: Option<Value>) -> Self {
        self.structured.write().push_back(value);
        self
    }

    /// Queue the reply for the next chat call.
    pub fn add_chat(self, response: ChatResponse) -> Self {
        self.chat.write().push_back(response);
        self
    }

    /// Answer chat calls with `handler` once the chat queue is empty.
    pub fn with_chat_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&[ChatMessage], &[ToolSpec]) -> ChatResponse + Send + Sync + 'static,
    {
        *self.chat_handler.write() = Some(Arc::new(handler));
        self
    }

    /// Fail every call with a network error.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls.read().iter().any(|c| c.method == method)
    }

    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Structured replies not yet consumed.
    pub fn pending_structured(&self) -> usize {
        self.structured.read().len()
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    fn check_failure(&self) -> LlmResult<()> {
        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(LlmError::Network(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    fn model(&self) -> &str {
        &self.model
    }

    async fn structured(&self, request: StructuredRequest) -> LlmResult<Option<Value>> {
        self.record_call(CapturedCall {
            method: "structured",
            name: Some(request.name.clone()),
            structured_method: Some(request.method),
            messages: request.messages,
            tools: Vec::new(),
        });
        self.check_failure()?;

        Ok(self.structured.write().pop_front().flatten())
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> LlmResult<ChatResponse> {
        self.record_call(CapturedCall {
            method: "chat",
            name: None,
            structured_method: None,
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });
        self.check_failure()?;

        if let Some(response) = self.chat.write().pop_front() {
            return Ok(response);
        }
        let handler = self.chat_handler.read().clone();
        match handler {
            Some(handler) => Ok(handler(messages, tools)),
            None => Ok(ChatResponse::text("done")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCall;
    use serde_json::json;

    #[tokio::test]
    async fn test_structured_queue_order() {
        let mock = MockLlm::new()
            .add_structured(Some(json!(1)))
            .add_structured(None)
            .add_structured(Some(json!(3)));

        let req = || StructuredRequest::new("N", json!({}), vec![]);
        assert_eq!(mock.structured(req()).await.unwrap(), Some(json!(1)));
        assert_eq!(mock.structured(req()).await.unwrap(), None);
        assert_eq!(mock.structured(req()).await.unwrap(), Some(json!(3)));
        // Exhausted queue yields no result
        assert_eq!(mock.structured(req()).await.unwrap(), None);
        assert_eq!(mock.get_method_calls("structured").len(), 4);
    }

    #[tokio::test]
    async fn test_chat_queue_then_handler() {
        let mock = MockLlm::new()
            .add_chat(ChatResponse::tool_calls(vec![ToolCall::new(
                "c1",
                "list_files",
                json!({}),
            )]))
            .with_chat_handler(|messages, _| {
                ChatResponse::text(format!("seen {}", messages.len()))
            });

        let first = mock.chat(&[ChatMessage::user("a")], &[]).await.unwrap();
        assert!(first.has_tool_calls());

        let second = mock
            .chat(&[ChatMessage::user("a"), ChatMessage::assistant("b")], &[])
            .await
            .unwrap();
        assert_eq!(second.content.as_deref(), Some("seen 2"));
    }

    #[tokio::test]
    async fn test_captures_tools_and_failure() {
        let mock = MockLlm::new().simulate_failure("offline");
        let tools = vec![ToolSpec::new("read_file", "read", json!({}))];

        let err = mock.chat(&[ChatMessage::user("x")], &tools).await.unwrap_err();
        assert!(err.to_string().contains("offline"));

        let calls = mock.get_calls();
        assert_eq!(calls[0].tools, vec!["read_file".to_string()]);
        assert_eq!(calls[0].transcript(), "x");
        assert!(mock.was_called("chat"));

        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
    }
}
