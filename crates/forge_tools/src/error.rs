//! Error types for the file tools.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Attempt to access '{path}' outside project root {root}")]
    PathOutsideRoot { path: String, root: PathBuf },

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Failed to walk directory: {0}")]
    Walk(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    pub fn outside(path: impl Into<String>, root: &Path) -> Self {
        Self::PathOutsideRoot {
            path: path.into(),
            root: root.to_path_buf(),
        }
    }

    pub fn invalid_args(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

impl From<walkdir::Error> for ToolError {
    fn from(err: walkdir::Error) -> Self {
        Self::Walk(err.to_string())
    }
}
