//! # forge_core
//!
//! Pipeline state, data model and stage executor for codeforge.
//!
//! # Architecture
//!
//! - **Models**: [`Plan`], [`TaskPlan`] and [`ImplementationStep`], the
//!   structured values the planner and architect produce
//! - **State**: [`PipelineState`] threaded through every stage, and the
//!   [`CoderState`] cursor over implementation steps
//! - **Stages**: the [`Stage`] trait and the [`route_after`] routing function
//! - **Executor**: [`PipelineExecutor`] runs stages from the registry until
//!   routing ends or the recursion limit is hit
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forge_core::{PipelineExecutor, StageRegistry};
//!
//! let registry = StageRegistry::new()
//!     .with_stage(Arc::new(planner))
//!     .with_stage(Arc::new(architect))
//!     .with_stage(Arc::new(coder));
//!
//! let executor = PipelineExecutor::new(Arc::new(registry));
//! let state = executor.invoke("Build a todo app", 100).await?;
//! ```

pub mod error;
pub mod executor;
pub mod models;
pub mod registry;
pub mod report;
pub mod stage;
pub mod state;

pub use error::{CoreError, CoreResult, StageError};
pub use executor::{PipelineExecutor, DEFAULT_RECURSION_LIMIT};
pub use models::{FileSpec, ImplementationStep, Plan, StepOutcome, StepStatus, TaskPlan};
pub use registry::StageRegistry;
pub use report::RunReport;
pub use stage::{is_terminal, route_after, Route, Stage, StageId};
pub use state::{CoderState, PipelineState, PipelineStatus};
