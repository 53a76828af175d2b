//! Coder agent: works through a [`TaskPlan`] one step per invocation.
//!
//! Each step reads the target file, hands the task to a tool-calling
//! sub-agent, and then checks the write journal to decide whether the file
//! was actually produced. Steps that never write their target are retried
//! and then either skipped or treated as fatal, depending on
//! [`FailurePolicy`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use forge_core::{CoderState, CoreError, ImplementationStep, PipelineStatus, StepOutcome};
use forge_llm::LlmClient;
use forge_tools::ToolBox;

use crate::error::{AgentError, AgentResult};
use crate::prompts::{coder_system_prompt, step_instruction};
use crate::react::{ToolCallingAgent, DEFAULT_MAX_TOOL_TURNS};

/// What to do with a step that never wrote its file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the step as failed and move on.
    #[default]
    Skip,
    /// Abort the run.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown failure policy '{}', expected skip or abort", other)),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoderConfig {
    /// Sub-agent runs per step before the failure policy applies.
    pub max_attempts: u32,
    /// Model turns per sub-agent run.
    pub max_tool_turns: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
            failure_policy: FailurePolicy::Skip,
        }
    }
}

pub struct CoderAgent {
    llm: Arc<dyn LlmClient>,
    tools: ToolBox,
    config: CoderConfig,
}

impl CoderAgent {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolBox) -> Self {
        Self::with_config(llm, tools, CoderConfig::default())
    }

    pub fn with_config(llm: Arc<dyn LlmClient>, tools: ToolBox, config: CoderConfig) -> Self {
        Self { llm, tools, config }
    }

    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    /// Run the current step and advance the cursor.
    ///
    /// Returns [`PipelineStatus::Done`] once every step is consumed, in the
    /// same call that consumes the last one. On a state that is already done
    /// this returns immediately without reading, writing or calling the model.
    pub async fn step(&self, coder: &mut CoderState) -> AgentResult<PipelineStatus> {
        if coder.is_done() {
            return Ok(PipelineStatus::Done);
        }

        let index = coder.current_step_idx;
        let step = coder
            .current_step()
            .cloned()
            .ok_or(CoreError::MissingState("current implementation step"))?;

        info!(
            step = index + 1,
            of = coder.step_count(),
            file = %step.filepath,
            "Coding step"
        );

        let outcome = self.run_step(index, &step).await?;
        coder.advance(outcome);

        if coder.is_done() {
            Ok(PipelineStatus::Done)
        } else {
            Ok(PipelineStatus::Running)
        }
    }

    async fn run_step(
        &self,
        index: usize,
        step: &ImplementationStep,
    ) -> AgentResult<StepOutcome> {
        let root = self.tools.root();
        let target = match root.normalize(&step.filepath) {
            Ok(target) => target,
            Err(e) => return self.give_up(index, step, 0, 0, e.to_string()),
        };

        let agent = ToolCallingAgent::new(self.llm.clone(), self.tools.clone())
            .with_max_turns(self.config.max_tool_turns);
        let max_attempts = self.config.max_attempts.max(1);
        let mut diagnostics = Vec::new();
        let mut tool_calls = 0;
        let mut bytes_read = 0;

        for attempt in 1..=max_attempts {
            let existing = match self.tools.read_file(&step.filepath) {
                Ok(content) => content,
                Err(e) => {
                    diagnostics.push(format!("attempt {}: could not read target: {}", attempt, e));
                    String::new()
                }
            };
            let instruction = step_instruction(step, &existing);
            bytes_read = existing.len();

            let mark = self.tools.journal_len();
            let transcript = agent.run(coder_system_prompt(), &instruction).await?;
            tool_calls += transcript.tool_calls;

            let write = self
                .tools
                .writes_since(mark)
                .into_iter()
                .filter(|w| w.path == target)
                .last();

            if let Some(write) = write {
                let written_path = root.resolve(&write.path)?;
                let mut outcome = StepOutcome::written(
                    index,
                    step.filepath.clone(),
                    written_path,
                    write.bytes,
                    write.sha256,
                )
                .with_attempts(attempt)
                .with_bytes_read(bytes_read)
                .with_tool_calls(tool_calls);

                if transcript.tool_errors > 0 {
                    diagnostics.push(format!(
                        "attempt {}: {} tool error(s)",
                        attempt, transcript.tool_errors
                    ));
                }
                if !diagnostics.is_empty() {
                    outcome = outcome.with_diagnostic(diagnostics.join("; "));
                }

                info!(file = %step.filepath, bytes = write.bytes, attempt, "Step written");
                return Ok(outcome);
            }

            let reason = if transcript.hit_turn_limit {
                "turn limit reached"
            } else {
                "finished"
            };
            let diagnostic = format!(
                "attempt {}: {} without writing {} ({} tool calls, {} errors)",
                attempt, reason, step.filepath, transcript.tool_calls, transcript.tool_errors
            );
            warn!("{}", diagnostic);
            diagnostics.push(diagnostic);
        }

        self.give_up(index, step, max_attempts, tool_calls, diagnostics.join("; "))
            .map(|outcome| outcome.with_bytes_read(bytes_read))
    }

    fn give_up(
        &self,
        index: usize,
        step: &ImplementationStep,
        attempts: u32,
        tool_calls: usize,
        message: String,
    ) -> AgentResult<StepOutcome> {
        match self.config.failure_policy {
            FailurePolicy::Skip => {
                warn!(file = %step.filepath, "Skipping step: {}", message);
                Ok(StepOutcome::failed(index, step.filepath.clone(), message)
                    .with_attempts(attempts)
                    .with_tool_calls(tool_calls))
            }
            FailurePolicy::Abort => Err(AgentError::StepFailed {
                index,
                filepath: step.filepath.clone(),
                attempts,
                message,
            }),
        }
    }
}
