//! Pipeline executor.
//!
//! Drives the stage graph from the entry stage until routing reaches
//! [`Route::End`], bounding the total number of stage invocations.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::error::{CoreError, CoreResult};
use crate::registry::StageRegistry;
use crate::stage::{route_after, Route, StageId};
use crate::state::{PipelineState, PipelineStatus};

/// Default ceiling on stage invocations per run.
pub const DEFAULT_RECURSION_LIMIT: usize = 100;

/// Runs the planner → architect → coder graph.
pub struct PipelineExecutor {
    registry: Arc<StageRegistry>,
}

impl PipelineExecutor {
    /// Create a new executor with the given registry.
    pub fn new(registry: Arc<StageRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Start a fresh run for `prompt`.
    pub async fn invoke(
        &self,
        prompt: impl Into<String>,
        recursion_limit: usize,
    ) -> CoreResult<PipelineState> {
        self.run(PipelineState::new(prompt), recursion_limit).await
    }

    /// Execute stages against `state` until the graph terminates.
    ///
    /// Fails with [`CoreError::RecursionLimit`] when more than
    /// `recursion_limit` stage invocations would be needed, and with
    /// [`CoreError::StageFailed`] as soon as any stage errors. There is no
    /// partial-result recovery: the state is dropped on error.
    pub async fn run(
        &self,
        mut state: PipelineState,
        recursion_limit: usize,
    ) -> CoreResult<PipelineState> {
        let missing = self.registry.missing();
        if let Some(id) = missing.first() {
            return Err(CoreError::StageNotFound(*id));
        }

        state.status = PipelineStatus::Running;
        if state.started_at.is_none() {
            state.started_at = Some(Utc::now());
        }

        info!(run_id = %state.run_id, "Starting pipeline run");

        let mut route = Route::Stage(StageId::entry());
        while let Route::Stage(id) = route {
            if state.invocations >= recursion_limit {
                error!(
                    "Recursion limit of {} reached at stage {}",
                    recursion_limit, id
                );
                return Err(CoreError::RecursionLimit {
                    limit: recursion_limit,
                });
            }

            let stage = self.registry.get_required(id)?;
            state.invocations += 1;

            debug!(invocation = state.invocations, "Executing stage: {}", id);
            let started = Instant::now();

            if let Err(e) = stage.execute(&mut state).await {
                error!("Stage '{}' failed: {}", id, e);
                return Err(CoreError::stage_failed(id, e));
            }

            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Stage '{}' completed", id
            );

            route = route_after(id, &state);
        }

        state.status = PipelineStatus::Done;
        state.completed_at = Some(Utc::now());

        info!(
            run_id = %state.run_id,
            invocations = state.invocations,
            "Pipeline run completed"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::models::{ImplementationStep, Plan, StepOutcome, TaskPlan};
    use crate::stage::Stage;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub TestStage {}

        #[async_trait]
        impl Stage for TestStage {
            fn id(&self) -> StageId;
            async fn execute(&self, state: &mut PipelineState) -> Result<(), StageError>;
        }
    }

    fn stage(id: StageId) -> MockTestStage {
        let mut mock = MockTestStage::new();
        mock.expect_id().return_const(id);
        mock
    }

    fn planner_ok() -> MockTestStage {
        let mut planner = stage(StageId::Planner);
        planner
            .expect_execute()
            .times(1)
            .returning(|state: &mut PipelineState| {
                state.plan = Some(Arc::new(Plan::new("app", "desc").with_file("a.js", "a")));
                Ok(())
            });
        planner
    }

    fn architect_with(steps: usize) -> MockTestStage {
        let mut architect = stage(StageId::Architect);
        architect
            .expect_execute()
            .times(1)
            .returning(move |state: &mut PipelineState| {
                let plan = state.require_plan()?;
                let steps = (0..steps)
                    .map(|i| ImplementationStep::new("a.js", format!("step {}", i)))
                    .collect();
                state.task_plan = Some(Arc::new(TaskPlan::new(plan, steps)));
                Ok(())
            });
        architect
    }

    /// Coder double that advances one step per call.
    struct CountingCoder;

    #[async_trait]
    impl Stage for CountingCoder {
        fn id(&self) -> StageId {
            StageId::Coder
        }

        async fn execute(&self, state: &mut PipelineState) -> Result<(), StageError> {
            let coder = state.coder_state_mut()?;
            if let Some(step) = coder.current_step().cloned() {
                let index = coder.current_step_idx;
                coder.advance(StepOutcome::failed(index, step.filepath, "not written"));
            }
            Ok(())
        }
    }

    fn registry(planner: MockTestStage, architect: MockTestStage) -> Arc<StageRegistry> {
        Arc::new(
            StageRegistry::new()
                .with_stage(Arc::new(planner))
                .with_stage(Arc::new(architect))
                .with_stage(Arc::new(CountingCoder)),
        )
    }

    #[tokio::test]
    async fn test_run_visits_each_step_once() {
        let executor = PipelineExecutor::new(registry(planner_ok(), architect_with(3)));

        let state = executor.invoke("build", DEFAULT_RECURSION_LIMIT).await.unwrap();

        assert_eq!(state.status, PipelineStatus::Done);
        // planner + architect + one coder call per step
        assert_eq!(state.invocations, 5);
        assert_eq!(state.outcomes().len(), 3);
        assert!(state.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_zero_steps_needs_one_coder_call() {
        let executor = PipelineExecutor::new(registry(planner_ok(), architect_with(0)));

        let state = executor.invoke("build", 10).await.unwrap();

        assert_eq!(state.invocations, 3);
        assert!(state.outcomes().is_empty());
        assert!(state.coder_state.unwrap().is_done());
    }

    #[tokio::test]
    async fn test_recursion_limit() {
        let executor = PipelineExecutor::new(registry(planner_ok(), architect_with(10)));

        let err = executor.invoke("build", 5).await.unwrap_err();

        assert!(matches!(err, CoreError::RecursionLimit { limit: 5 }));
    }

    #[tokio::test]
    async fn test_failing_planner_stops_the_run() {
        let mut planner = stage(StageId::Planner);
        planner
            .expect_execute()
            .times(1)
            .returning(|_state: &mut PipelineState| Err("no structured output".into()));
        let mut architect = stage(StageId::Architect);
        architect.expect_execute().never();

        let executor = PipelineExecutor::new(registry(planner, architect));
        let err = executor.invoke("build", 10).await.unwrap_err();

        assert_eq!(err.failed_stage(), Some(StageId::Planner));
        assert!(err.to_string().contains("no structured output"));
    }

    #[tokio::test]
    async fn test_missing_stage_is_reported_before_running() {
        let mut planner = stage(StageId::Planner);
        planner.expect_execute().never();
        let executor = PipelineExecutor::new(Arc::new(
            StageRegistry::new().with_stage(Arc::new(planner)),
        ));

        let err = executor.invoke("build", 10).await.unwrap_err();
        assert!(matches!(err, CoreError::StageNotFound(StageId::Architect)));
    }
}
