//! Data models produced by the planner, architect and coder stages.
//!
//! Field documentation on the model-facing types ([`Plan`], [`FileSpec`],
//! [`ImplementationStep`]) doubles as the schema description sent to the
//! model, so keep it short and instructive.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A file the planner wants created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileSpec {
    /// The path to the file to be created or modified
    pub path: String,
    /// The purpose of the file, e.g. 'main application logic', 'data processing module'
    pub purpose: String,
}

impl FileSpec {
    pub fn new(path: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            purpose: purpose.into(),
        }
    }
}

/// Request-level summary of what to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// The name of the app to be built
    pub name: String,
    /// A one-line description of the app to be built
    pub description: String,
    /// The tech stack to be used for the app, e.g. 'python', 'javascript', 'react'
    #[serde(default)]
    pub techstack: String,
    /// A list of features the app should have, e.g. 'user authentication'
    #[serde(default)]
    pub features: Vec<String>,
    /// A list of files to be created, each with a 'path' and 'purpose'
    pub files: Vec<FileSpec>,
}

impl Plan {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            techstack: String::new(),
            features: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn with_techstack(mut self, techstack: impl Into<String>) -> Self {
        self.techstack = techstack.into();
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    pub fn with_file(mut self, path: impl Into<String>, purpose: impl Into<String>) -> Self {
        self.files.push(FileSpec::new(path, purpose));
        self
    }

    /// Check the plan is usable by the architect.
    ///
    /// A plan must declare at least one file, and every declared path must be
    /// non-blank and unique.
    pub fn validate(&self) -> CoreResult<()> {
        let mut issues = Vec::new();

        if self.files.is_empty() {
            issues.push("plan declares no files".to_string());
        }

        let mut seen = HashSet::new();
        for (i, file) in self.files.iter().enumerate() {
            let path = file.path.trim();
            if path.is_empty() {
                issues.push(format!("file #{} has an empty path", i + 1));
            } else if !seen.insert(path) {
                issues.push(format!("file '{}' is declared more than once", path));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidPlan(issues.join("; ")))
        }
    }

    /// Declared file paths, in plan order.
    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }
}

/// One unit of coding work targeting a single file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ImplementationStep {
    /// The path to the file to be modified
    pub filepath: String,
    /// A detailed description of the task to be performed on the file, e.g. 'add user authentication', 'implement data processing logic'
    pub task_description: String,
}

impl ImplementationStep {
    pub fn new(filepath: impl Into<String>, task_description: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            task_description: task_description.into(),
        }
    }
}

/// Ordered breakdown of a [`Plan`] into implementation steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    /// The plan these steps were derived from.
    pub plan: Arc<Plan>,
    pub implementation_steps: Vec<ImplementationStep>,
}

impl TaskPlan {
    pub fn new(plan: Arc<Plan>, implementation_steps: Vec<ImplementationStep>) -> Self {
        Self {
            plan,
            implementation_steps,
        }
    }

    pub fn len(&self) -> usize {
        self.implementation_steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.implementation_steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&ImplementationStep> {
        self.implementation_steps.get(index)
    }

    /// Check every step is actionable and no step is repeated verbatim.
    ///
    /// Several steps may target the same file; only exact duplicates
    /// (same path and same task) are rejected.
    pub fn validate(&self) -> CoreResult<()> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (i, step) in self.implementation_steps.iter().enumerate() {
            let n = i + 1;
            if step.filepath.trim().is_empty() {
                issues.push(format!("step #{} has an empty filepath", n));
            }
            if step.task_description.trim().is_empty() {
                issues.push(format!("step #{} has an empty task description", n));
            }
            if !seen.insert((step.filepath.trim(), step.task_description.trim())) {
                issues.push(format!(
                    "step #{} duplicates an earlier step for '{}'",
                    n, step.filepath
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidTaskPlan(issues.join("; ")))
        }
    }

    /// Step paths the plan never declared.
    pub fn undeclared_paths(&self) -> Vec<&str> {
        let declared: HashSet<&str> = self.plan.file_paths().map(str::trim).collect();
        let mut undeclared = Vec::new();
        for step in &self.implementation_steps {
            let path = step.filepath.trim();
            if !declared.contains(path) && !undeclared.contains(&path) {
                undeclared.push(path);
            }
        }
        undeclared
    }
}

/// Whether a coding step produced its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The sub-agent wrote the target file.
    Written,
    /// No write to the target file was observed after all attempts.
    Failed,
}

/// Result of one coder invocation on a RUNNING state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub index: usize,
    pub filepath: String,
    pub status: StepStatus,
    pub attempts: u32,
    /// Size of the target file as read before the last attempt.
    #[serde(default)]
    pub bytes_read: usize,
    /// Resolved path of the last write to the target, if any.
    pub written_path: Option<PathBuf>,
    pub bytes_written: Option<usize>,
    /// SHA-256 of the last content written to the target, hex encoded.
    pub content_hash: Option<String>,
    /// Tool calls made by the sub-agent across all attempts.
    pub tool_calls: usize,
    pub diagnostic: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl StepOutcome {
    pub fn written(
        index: usize,
        filepath: impl Into<String>,
        written_path: PathBuf,
        bytes_written: usize,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            filepath: filepath.into(),
            status: StepStatus::Written,
            attempts: 1,
            bytes_read: 0,
            written_path: Some(written_path),
            bytes_written: Some(bytes_written),
            content_hash: Some(content_hash.into()),
            tool_calls: 0,
            diagnostic: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(index: usize, filepath: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            index,
            filepath: filepath.into(),
            status: StepStatus::Failed,
            attempts: 1,
            bytes_read: 0,
            written_path: None,
            bytes_written: None,
            content_hash: None,
            tool_calls: 0,
            diagnostic: Some(diagnostic.into()),
            completed_at: Utc::now(),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_bytes_read(mut self, bytes_read: usize) -> Self {
        self.bytes_read = bytes_read;
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: usize) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn is_written(&self) -> bool {
        self.status == StepStatus::Written
    }
}
