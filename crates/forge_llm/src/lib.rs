//! # forge_llm
//!
//! Chat model access for codeforge.
//!
//! - [`LlmClient`]: the trait stages are written against
//! - [`OpenAiClient`]: OpenAI-compatible chat completions with tool calling
//! - [`TracedLlm`]: logs start, end and failure of every call
//! - [`MockLlm`]: scripted client for tests
//! - [`structured_output`]: request and decode a typed value

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod openai;
pub mod traced;
pub mod types;

pub use client::{extract_json, schema_for, structured_output, LlmClient};
pub use config::{LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{LlmError, LlmResult};
pub use mock::{CapturedCall, ChatHandler, MockLlm};
pub use openai::OpenAiClient;
pub use traced::TracedLlm;
pub use types::{
    ChatMessage, ChatResponse, Role, StructuredMethod, StructuredRequest, ToolCall, ToolSpec,
    Usage,
};
