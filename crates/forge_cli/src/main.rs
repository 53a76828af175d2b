//! codeforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: LLM not configured
//! - 4: Planning or architecture failure
//! - 5: Recursion limit reached

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;

use commands::{Cli, Commands};
use config::ConfigError;
use forge_agents::AgentError;
use forge_core::CoreError;
use forge_llm::LlmError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const LLM_NOT_CONFIGURED: u8 = 3;
    pub const DESIGN_FAILURE: u8 = 4;
    pub const RECURSION_LIMIT: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Plan(args) => commands::plan::execute(args).await,
        Commands::Tools(args) => commands::tools::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let registry = tracing_subscriber::registry();
    let result = if json {
        registry
            .with(fmt::layer().json().with_target(false))
            .with(env_filter(verbose))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false))
            .with(env_filter(verbose))
            .try_init()
    };

    if result.is_err() {
        // Logging already initialized, continue
    }
}

/// `RUST_LOG` wins; otherwise codeforge crates log at info (debug when
/// verbose) and everything else at warn.
fn env_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("forge={},warn", level)))
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
        if let Some(LlmError::NotConfigured(_)) = cause.downcast_ref::<LlmError>() {
            return ExitCodes::LLM_NOT_CONFIGURED;
        }
        if let Some(CoreError::RecursionLimit { .. }) = cause.downcast_ref::<CoreError>() {
            return ExitCodes::RECURSION_LIMIT;
        }
        if let Some(agent_err) = cause.downcast_ref::<AgentError>() {
            if agent_err.is_design_failure() {
                return ExitCodes::DESIGN_FAILURE;
            }
        }
    }
    ExitCodes::GENERAL_ERROR
}
