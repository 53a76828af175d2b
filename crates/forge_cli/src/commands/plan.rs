//! Plan command - produce the task plan without writing files.

use anyhow::{Context, Result};
use clap::Args;

use forge_agents::design;

use super::{build_client, load_config, ModelArgs};

#[derive(Args)]
pub struct PlanArgs {
    /// What to build, in plain language
    prompt: String,

    /// Print the task plan as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    model: ModelArgs,
}

pub async fn execute(args: PlanArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let mut config = load_config(&cwd)?;
    args.model.apply(&mut config);

    let llm = build_client(&config)?;
    let task_plan = design(llm, &args.prompt)
        .await
        .context("Planning failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&task_plan)?);
        return Ok(());
    }

    let plan = &task_plan.plan;
    println!("📋 {}", plan.name);
    println!("   {}", plan.description);
    if !plan.techstack.is_empty() {
        println!("   Stack: {}", plan.techstack);
    }
    for feature in &plan.features {
        println!("   • {}", feature);
    }

    println!();
    println!("📁 Files:");
    for file in &plan.files {
        println!("   {} - {}", file.path, file.purpose);
    }

    println!();
    println!("🛠️  Implementation steps:");
    for (i, step) in task_plan.implementation_steps.iter().enumerate() {
        println!("   {}. {}", i + 1, step.filepath);
        println!("      {}", step.task_description);
    }

    let undeclared = task_plan.undeclared_paths();
    if !undeclared.is_empty() {
        println!();
        println!("⚠️  Steps target undeclared files: {}", undeclared.join(", "));
    }

    Ok(())
}
