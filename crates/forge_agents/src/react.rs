//! Tool-calling agent loop.
//!
//! The model is called with the conversation and the tool specs. Every tool
//! call it requests is executed and its result appended, until it answers
//! without tool calls or the turn budget runs out.

use std::sync::Arc;

use tracing::{debug, warn};

use forge_llm::{ChatMessage, LlmClient};
use forge_tools::ToolBox;

use crate::error::AgentResult;

pub const DEFAULT_MAX_TOOL_TURNS: usize = 25;

/// What happened during one agent run.
#[derive(Debug, Clone, Default)]
pub struct AgentTranscript {
    pub messages: Vec<ChatMessage>,
    /// Text of the final answer, if the model gave one.
    pub final_answer: Option<String>,
    /// Model turns taken.
    pub turns: usize,
    pub tool_calls: usize,
    /// Tool calls whose result was an error.
    pub tool_errors: usize,
    /// The run stopped because the turn budget was spent.
    pub hit_turn_limit: bool,
}

/// Runs a model against a [`ToolBox`] until it stops calling tools.
pub struct ToolCallingAgent {
    llm: Arc<dyn LlmClient>,
    tools: ToolBox,
    max_turns: usize,
}

impl ToolCallingAgent {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolBox) -> Self {
        Self {
            llm,
            tools,
            max_turns: DEFAULT_MAX_TOOL_TURNS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub async fn run(&self, system: &str, instruction: &str) -> AgentResult<AgentTranscript> {
        let specs = self.tools.specs();
        let mut transcript = AgentTranscript {
            messages: vec![ChatMessage::system(system), ChatMessage::user(instruction)],
            ..AgentTranscript::default()
        };

        while transcript.turns < self.max_turns {
            transcript.turns += 1;
            let response = self.llm.chat(&transcript.messages, &specs).await?;

            if !response.has_tool_calls() {
                let answer = response.content.unwrap_or_default();
                transcript.messages.push(ChatMessage::assistant(answer.clone()));
                transcript.final_answer = Some(answer);
                debug!(
                    turns = transcript.turns,
                    tool_calls = transcript.tool_calls,
                    "Agent finished"
                );
                return Ok(transcript);
            }

            transcript.messages.push(ChatMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let result = self.tools.invoke(&call.name, &call.arguments);
                transcript.tool_calls += 1;
                if result.starts_with("ERROR:") {
                    transcript.tool_errors += 1;
                }
                transcript
                    .messages
                    .push(ChatMessage::tool_result(call.id.clone(), result));
            }
        }

        warn!(
            max_turns = self.max_turns,
            tool_calls = transcript.tool_calls,
            "Agent stopped at its turn limit"
        );
        transcript.hit_turn_limit = true;
        Ok(transcript)
    }
}
