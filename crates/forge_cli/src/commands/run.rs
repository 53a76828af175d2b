//! Run command - plan, design and write a project.

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use forge_agents::{FailurePolicy, Forge};
use forge_core::{PipelineState, RunReport, StepStatus};
use forge_tools::{ProjectRoot, ToolBox};

use super::{build_client, load_config, ModelArgs, ProjectArgs};

#[derive(Args)]
pub struct RunArgs {
    /// What to build, in plain language
    prompt: String,

    /// Maximum number of stage invocations
    #[arg(long, env = "FORGE_RECURSION_LIMIT")]
    recursion_limit: Option<usize>,

    #[command(flatten)]
    project: ProjectArgs,

    #[command(flatten)]
    model: ModelArgs,

    /// Coding attempts per step before the failure policy applies
    #[arg(long)]
    max_attempts: Option<u32>,

    /// What to do with a step that never writes its file (skip or abort)
    #[arg(long)]
    failure_policy: Option<FailurePolicy>,

    /// Do not save a run report
    #[arg(long)]
    no_report: bool,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let mut config = load_config(&cwd)?;
    args.project.apply(&mut config);
    args.model.apply(&mut config);
    if let Some(limit) = args.recursion_limit {
        config.recursion_limit = limit;
    }
    if let Some(attempts) = args.max_attempts {
        config.coder.max_attempts = attempts;
    }
    if let Some(policy) = args.failure_policy {
        config.coder.failure_policy = policy;
    }
    if args.no_report {
        config.save_report = false;
    }

    let llm = build_client(&config)?;
    let project_path = config.project_path(&cwd);
    let root = ProjectRoot::init(&project_path)
        .with_context(|| format!("Failed to prepare project directory {:?}", project_path))?;

    println!("🔨 Forging: {}", args.prompt);
    println!("   Project directory: {}", root.path().display());
    println!("   Model: {}", config.llm.model);
    println!();

    let forge = Forge::with_config(llm, ToolBox::new(root), config.coder.clone());

    let state = PipelineState::new(args.prompt.clone());
    let run_id = state.run_id;

    match forge.run_state(state, config.recursion_limit).await {
        Ok(state) => {
            print_summary(&state);
            if config.save_report {
                let path = RunReport::from_state(&state).save(&cwd)?;
                println!("📄 Report: {}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            if config.save_report {
                let report = RunReport::aborted(run_id, &args.prompt, e.to_string());
                match report.save(&cwd) {
                    Ok(path) => info!("Saved failure report to {:?}", path),
                    Err(save_err) => warn!("Could not save failure report: {}", save_err),
                }
            }
            Err(e).context("Pipeline run failed")
        }
    }
}

fn print_summary(state: &PipelineState) {
    if let Some(plan) = &state.plan {
        println!("📋 {} - {}", plan.name, plan.description);
    }

    let outcomes = state.outcomes();
    for outcome in outcomes {
        match outcome.status {
            StepStatus::Written => println!(
                "   ✅ {} ({} bytes)",
                outcome.filepath,
                outcome.bytes_written.unwrap_or(0)
            ),
            StepStatus::Failed => println!(
                "   ❌ {}: {}",
                outcome.filepath,
                outcome.diagnostic.as_deref().unwrap_or("no write observed")
            ),
        }
    }

    let failed = outcomes
        .iter()
        .filter(|o| o.status == StepStatus::Failed)
        .count();

    println!();
    if failed == 0 {
        println!(
            "✅ Done: {} step(s) in {} stage invocations",
            outcomes.len(),
            state.invocations
        );
    } else {
        println!(
            "⚠️  Done with {} of {} step(s) failed",
            failed,
            outcomes.len()
        );
    }
}
