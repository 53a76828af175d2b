//! CLI command definitions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use forge_llm::{LlmClient, OpenAiClient};

use crate::config::ForgeConfig;

pub mod plan;
pub mod run;
pub mod tools;

/// codeforge - plan, design and write a project from one prompt
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "codeforge - plan, design and write a project from one prompt")]
#[command(long_about = r#"
codeforge turns a plain-language request into source files. A planner
drafts the project, an architect breaks it into implementation steps, and a
coder works through the steps one at a time using file tools confined to the
project directory.

COMMANDS:
  run    → Plan, design and write the project
  plan   → Plan and design only; nothing is written
  tools  → Show the coder's tools and the current project files

CONFIGURATION:
  forge.toml in the working directory, then OPENAI_API_KEY, FORGE_LLM_MODEL,
  FORGE_LLM_BASE_URL, FORGE_PROJECT_DIR and FORGE_RECURSION_LIMIT (a .env
  file is honoured), then command-line flags.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - LLM not configured
  4 - Planning or architecture failure
  5 - Recursion limit reached
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full planner → architect → coder pipeline
    Run(run::RunArgs),

    /// Produce the task plan without writing any files
    Plan(plan::PlanArgs),

    /// List the coder's tools and the files in the project directory
    Tools(tools::ToolsArgs),
}

/// Model options shared by commands that talk to the LLM.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Model to use
    #[arg(long, env = "FORGE_LLM_MODEL")]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "FORGE_LLM_BASE_URL")]
    pub base_url: Option<String>,
}

impl ModelArgs {
    pub fn apply(&self, config: &mut ForgeConfig) {
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(url) = &self.base_url {
            config.llm.base_url = url.clone();
        }
    }
}

/// Project directory option shared by commands that touch files.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Directory generated files are written to
    #[arg(long, env = "FORGE_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn apply(&self, config: &mut ForgeConfig) {
        if let Some(dir) = &self.project_dir {
            config.project_dir = dir.clone();
        }
    }
}

/// Load configuration for a command started in `cwd`.
pub fn load_config(cwd: &std::path::Path) -> Result<ForgeConfig> {
    ForgeConfig::load(cwd).context("Failed to load configuration")
}

/// The OpenAI-compatible client described by `config`.
pub fn build_client(config: &ForgeConfig) -> Result<Arc<dyn LlmClient>> {
    let client = OpenAiClient::new(config.llm.clone())
        .context("Failed to configure the LLM client")?;
    Ok(Arc::new(client))
}
