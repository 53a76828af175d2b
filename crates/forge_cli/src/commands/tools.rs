//! Tools command - show the coder's tools and the project files.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use forge_tools::{default_tools, ProjectRoot, ToolBox};

use super::{load_config, ProjectArgs};

#[derive(Args)]
pub struct ToolsArgs {
    #[command(flatten)]
    project: ProjectArgs,
}

pub async fn execute(args: ToolsArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let mut config = load_config(&cwd)?;
    args.project.apply(&mut config);

    println!("🧰 Tools:");
    for tool in default_tools() {
        println!("   {} - {}", tool.name(), tool.description());
    }
    println!();

    // Listing must not create the project directory
    let project_path = config.project_path(&cwd);
    if !project_path.is_dir() {
        println!("📁 {} does not exist yet", project_path.display());
        return Ok(());
    }

    let toolbox = ToolBox::new(ProjectRoot::init(&project_path)?);
    println!("📁 {}", toolbox.root().path().display());

    let files = toolbox.try_invoke("list_files", &json!({ "directory": "." }))?;
    if files.is_empty() {
        println!("   (empty)");
    }
    for file in files.lines() {
        println!("   {}", file);
    }

    Ok(())
}
