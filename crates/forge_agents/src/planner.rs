//! Planner agent: free-text request to [`Plan`].

use std::sync::Arc;

use tracing::info;

use forge_core::Plan;
use forge_llm::{structured_output, ChatMessage, LlmClient, LlmError, StructuredMethod};

use crate::error::{AgentError, AgentResult};
use crate::prompts::planner_prompt;

/// Turns the user's request into a validated [`Plan`].
pub struct PlannerAgent {
    llm: Arc<dyn LlmClient>,
}

impl PlannerAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Ask the model for a plan.
    ///
    /// A missing, malformed or invalid plan is a [`AgentError::Planning`]
    /// error. There is no retry and no fallback plan.
    pub async fn plan(&self, user_prompt: &str) -> AgentResult<Plan> {
        let messages = vec![ChatMessage::user(planner_prompt(user_prompt))];

        let plan = match structured_output::<Plan>(
            self.llm.as_ref(),
            messages,
            StructuredMethod::JsonSchema,
        )
        .await
        {
            Ok(Some(plan)) => plan,
            Ok(None) => {
                return Err(AgentError::planning(
                    "Planner did not return a valid response.",
                ))
            }
            Err(LlmError::Decode { message, .. }) => {
                return Err(AgentError::planning(format!("malformed plan: {}", message)))
            }
            Err(e) => return Err(e.into()),
        };

        plan.validate()
            .map_err(|e| AgentError::planning(e.to_string()))?;

        info!(
            name = %plan.name,
            files = plan.files.len(),
            features = plan.features.len(),
            "Plan ready"
        );
        Ok(plan)
    }
}
