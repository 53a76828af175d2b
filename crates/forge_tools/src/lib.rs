//! # forge_tools
//!
//! File tools for the coder, confined to a project root.
//!
//! - [`ProjectRoot`]: resolves paths and rejects anything outside the root
//! - [`ReadFile`], [`WriteFile`], [`ListFiles`], [`GetCurrentDirectory`]
//! - [`ToolBox`]: dispatches calls by name, logs them, and journals writes

pub mod error;
pub mod sandbox;
pub mod toolbox;
pub mod tools;

pub use error::{ToolError, ToolResult};
pub use sandbox::{ProjectRoot, DEFAULT_PROJECT_DIR};
pub use toolbox::ToolBox;
pub use tools::{
    default_tools, GetCurrentDirectory, ListFiles, ReadFile, Tool, ToolOutput, WriteFile,
    WriteRecord,
};
