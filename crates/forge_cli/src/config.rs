//! Run configuration.
//!
//! Precedence, lowest first: built-in defaults, `forge.toml` in the working
//! directory, environment variables, command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use forge_agents::CoderConfig;
use forge_core::DEFAULT_RECURSION_LIMIT;
use forge_llm::LlmConfig;
use forge_tools::DEFAULT_PROJECT_DIR;

pub const CONFIG_FILE: &str = "forge.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub llm: LlmConfig,
    /// Generated files land here; relative paths are resolved against the
    /// working directory.
    pub project_dir: PathBuf,
    pub recursion_limit: usize,
    pub coder: CoderConfig,
    /// Save a run report under `.forge/runs/`.
    pub save_report: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            project_dir: PathBuf::from(DEFAULT_PROJECT_DIR),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            coder: CoderConfig::default(),
            save_report: true,
        }
    }
}

impl ForgeConfig {
    /// Defaults, then `forge.toml` in `dir`, then the environment.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        Self::from_dir(dir)?.merge_env()
    }

    /// Defaults overridden by `forge.toml` in `dir`, if present.
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path,
            message: e.to_string(),
        })
    }

    fn merge_env(mut self) -> Result<Self, ConfigError> {
        self.llm = self.llm.merge_env();

        if let Some(dir) = env_var("FORGE_PROJECT_DIR") {
            self.project_dir = PathBuf::from(dir);
        }
        if let Some(value) = env_var("FORGE_RECURSION_LIMIT") {
            self.recursion_limit = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "FORGE_RECURSION_LIMIT",
                value,
            })?;
        }
        Ok(self)
    }

    /// Absolute project directory for a run started in `cwd`.
    pub fn project_path(&self, cwd: &Path) -> PathBuf {
        if self.project_dir.is_absolute() {
            self.project_dir.clone()
        } else {
            cwd.join(&self.project_dir)
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
