//! Post-mortem run reports.
//!
//! A report is written once a run ends so the outcome of every coding step
//! can be inspected later. Reports are never read back to resume a run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{Plan, StepOutcome, StepStatus, TaskPlan};
use crate::state::{PipelineState, PipelineStatus};

/// Serializable summary of a finished (or failed) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub user_prompt: String,
    pub status: PipelineStatus,
    pub invocations: usize,
    pub plan: Option<Plan>,
    pub task_plan: Option<TaskPlan>,
    pub outcomes: Vec<StepOutcome>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Error that aborted the run, if any.
    pub error: Option<String>,
}

impl RunReport {
    pub fn from_state(state: &PipelineState) -> Self {
        Self {
            run_id: state.run_id,
            user_prompt: state.user_prompt.clone(),
            status: state.status,
            invocations: state.invocations,
            plan: state.plan.as_deref().cloned(),
            task_plan: state.task_plan.as_deref().cloned(),
            outcomes: state.outcomes().to_vec(),
            started_at: state.started_at,
            completed_at: state.completed_at,
            error: None,
        }
    }

    /// Report for a run that aborted before producing a final state.
    pub fn aborted(run_id: Uuid, user_prompt: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            run_id,
            user_prompt: user_prompt.into(),
            status: PipelineStatus::Running,
            invocations: 0,
            plan: None,
            task_plan: None,
            outcomes: Vec::new(),
            started_at: None,
            completed_at: Some(Utc::now()),
            error: Some(error.into()),
        }
    }

    /// Location of the report under `workspace`.
    pub fn path_in(&self, workspace: &Path) -> PathBuf {
        workspace
            .join(".forge")
            .join("runs")
            .join(format!("{}.json", self.run_id))
    }

    /// Save the report under `workspace` and return its path.
    pub fn save(&self, workspace: &Path) -> CoreResult<PathBuf> {
        let path = self.path_in(workspace);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        debug!("Saved run report to {:?}", path);
        Ok(path)
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn written_count(&self) -> usize {
        self.count(StepStatus::Written)
    }

    pub fn failed_count(&self) -> usize {
        self.count(StepStatus::Failed)
    }

    fn count(&self, status: StepStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}
