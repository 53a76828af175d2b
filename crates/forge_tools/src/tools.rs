//! The file tools offered to the coder.

use std::fs;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use forge_llm::{schema_for, ToolSpec};

use crate::error::{ToolError, ToolResult};
use crate::sandbox::ProjectRoot;

/// A completed write, as recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    /// Root-relative path.
    pub path: String,
    pub bytes: usize,
    /// SHA-256 of the written content, lowercase hex.
    pub sha256: String,
}

impl WriteRecord {
    pub fn new(path: impl Into<String>, content: &[u8]) -> Self {
        Self {
            path: path.into(),
            bytes: content.len(),
            sha256: format!("{:x}", Sha256::digest(content)),
        }
    }
}

/// What a tool call produced.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Text returned to the model.
    pub text: String,
    pub write: Option<WriteRecord>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            write: None,
        }
    }
}

/// A callable tool.
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    fn call(&self, root: &ProjectRoot, args: &Value) -> ToolResult<ToolOutput>;

    fn spec(&self) -> ToolSpec {
        ToolSpec::new(self.name(), self.description(), self.parameters())
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: &Value) -> ToolResult<T> {
    // A tool without arguments may be called with `null`
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args.clone()
    };
    serde_json::from_value(args).map_err(|e| ToolError::invalid_args(tool, e.to_string()))
}

fn require_path(tool: &str, path: &str) -> ToolResult<()> {
    if path.trim().is_empty() {
        return Err(ToolError::invalid_args(tool, "path must not be empty"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Path of the file, relative to the project root.
    pub path: String,
}

/// Returns file content, or an empty string when the file does not exist.
pub struct ReadFile;

impl Tool for ReadFile {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Reads content from a file at the specified path within the project root."
    }

    fn parameters(&self) -> Value {
        schema_for::<ReadFileArgs>()
    }

    fn call(&self, root: &ProjectRoot, args: &Value) -> ToolResult<ToolOutput> {
        let args: ReadFileArgs = parse_args(self.name(), args)?;
        require_path(self.name(), &args.path)?;

        let path = root.resolve(&args.path)?;
        if !path.exists() {
            return Ok(ToolOutput::text(""));
        }
        Ok(ToolOutput::text(fs::read_to_string(&path)?))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteFileArgs {
    /// Path of the file, relative to the project root.
    pub path: String,
    /// Full new content of the file.
    pub content: String,
}

/// Writes a whole file, creating parent directories.
pub struct WriteFile;

impl Tool for WriteFile {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Writes content to a file at the specified path within the project root."
    }

    fn parameters(&self) -> Value {
        schema_for::<WriteFileArgs>()
    }

    fn call(&self, root: &ProjectRoot, args: &Value) -> ToolResult<ToolOutput> {
        let args: WriteFileArgs = parse_args(self.name(), args)?;
        require_path(self.name(), &args.path)?;

        let path = root.resolve(&args.path)?;
        if path == root.path() {
            return Err(ToolError::invalid_args(self.name(), "path names the project root"));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, args.content.as_bytes())?;

        Ok(ToolOutput {
            text: format!("WROTE:{}", path.display()),
            write: Some(WriteRecord::new(root.relative(&path), args.content.as_bytes())),
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFilesArgs {
    /// Directory to list, relative to the project root.
    #[serde(default = "current_dir")]
    pub directory: String,
}

fn current_dir() -> String {
    ".".to_string()
}

/// Recursively lists files under a directory, one root-relative path per line.
pub struct ListFiles;

impl Tool for ListFiles {
    fn name(&self) -> &'static str {
        "list_files"
    }

    fn description(&self) -> &'static str {
        "Lists all files in the specified directory within the project root."
    }

    fn parameters(&self) -> Value {
        schema_for::<ListFilesArgs>()
    }

    fn call(&self, root: &ProjectRoot, args: &Value) -> ToolResult<ToolOutput> {
        let args: ListFilesArgs = parse_args(self.name(), args)?;
        let dir = root.resolve(&args.directory)?;
        if !dir.is_dir() {
            return Ok(ToolOutput::text(""));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(root.relative(entry.path()));
            }
        }

        if files.is_empty() {
            return Ok(ToolOutput::text(""));
        }
        Ok(ToolOutput::text(files.join("\n")))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// Returns the project root.
pub struct GetCurrentDirectory;

impl Tool for GetCurrentDirectory {
    fn name(&self) -> &'static str {
        "get_current_directory"
    }

    fn description(&self) -> &'static str {
        "Returns the current working directory."
    }

    fn parameters(&self) -> Value {
        schema_for::<NoArgs>()
    }

    fn call(&self, root: &ProjectRoot, _args: &Value) -> ToolResult<ToolOutput> {
        Ok(ToolOutput::text(root.path().display().to_string()))
    }
}

/// The four coder tools in their advertised order.
pub fn default_tools() -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ReadFile),
        Box::new(WriteFile),
        Box::new(ListFiles),
        Box::new(GetCurrentDirectory),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, ProjectRoot) {
        let temp = TempDir::new().unwrap();
        let root = ProjectRoot::init(temp.path().join("proj")).unwrap();
        (temp, root)
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let (_temp, root) = sandbox();
        let out = ReadFile.call(&root, &json!({"path": "nope.txt"})).unwrap();
        assert_eq!(out.text, "");
        assert!(out.write.is_none());
    }

    #[test]
    fn test_write_creates_parents_and_records() {
        let (_temp, root) = sandbox();
        let out = WriteFile
            .call(&root, &json!({"path": "js/app.js", "content": "let x = 1;"}))
            .unwrap();

        let written = root.path().join("js").join("app.js");
        assert_eq!(out.text, format!("WROTE:{}", written.display()));
        assert_eq!(fs::read_to_string(&written).unwrap(), "let x = 1;");

        let record = out.write.unwrap();
        assert_eq!(record.path, "js/app.js");
        assert_eq!(record.bytes, 10);
        assert_eq!(record.sha256.len(), 64);

        let read = ReadFile.call(&root, &json!({"path": "js/app.js"})).unwrap();
        assert_eq!(read.text, "let x = 1;");
    }

    #[test]
    fn test_write_outside_root_rejected() {
        let (temp, root) = sandbox();
        let err = WriteFile
            .call(&root, &json!({"path": "../escape.txt", "content": "x"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::PathOutsideRoot { .. }));
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_through_symlinked_dir_rejected() {
        let (temp, root) = sandbox();
        let outside = temp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.path().join("link")).unwrap();

        let err = WriteFile
            .call(&root, &json!({"path": "link/new.txt", "content": "x"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::PathOutsideRoot { .. }));
        assert!(!outside.join("new.txt").exists());
    }

    #[test]
    fn test_invalid_arguments() {
        let (_temp, root) = sandbox();
        let err = WriteFile.call(&root, &json!({"path": "a.txt"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = ReadFile.call(&root, &json!({"path": "  "})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn test_list_files_recursive_and_sorted() {
        let (_temp, root) = sandbox();
        for path in ["b.txt", "a/c.txt", "a/b/d.txt"] {
            WriteFile
                .call(&root, &json!({"path": path, "content": "x"}))
                .unwrap();
        }

        let out = ListFiles.call(&root, &json!({})).unwrap();
        assert_eq!(out.text, "a/b/d.txt\na/c.txt\nb.txt");

        let out = ListFiles.call(&root, &json!({"directory": "a/b"})).unwrap();
        assert_eq!(out.text, "a/b/d.txt");

        let out = ListFiles.call(&root, &json!({"directory": "missing"})).unwrap();
        assert_eq!(out.text, "");
    }

    #[test]
    fn test_get_current_directory() {
        let (_temp, root) = sandbox();
        let out = GetCurrentDirectory.call(&root, &Value::Null).unwrap();
        assert_eq!(out.text, root.path().display().to_string());
    }

    #[test]
    fn test_specs_have_schemas() {
        let tools = default_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["read_file", "write_file", "list_files", "get_current_directory"]
        );

        let spec = WriteFile.spec();
        let required = spec.parameters["required"].as_array().unwrap();
        assert!(required.contains(&json!("path")));
        assert!(required.contains(&json!("content")));
    }
}
