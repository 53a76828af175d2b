//! Tool dispatch and the write journal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{info, warn};

use forge_llm::ToolSpec;

use crate::error::{ToolError, ToolResult};
use crate::sandbox::ProjectRoot;
use crate::tools::{default_tools, Tool, WriteRecord};

const ARG_PREVIEW_CHARS: usize = 60;

/// Dispatches tool calls by name inside one project root.
///
/// Clones share the journal, so a stage can hand a clone to a sub-agent and
/// inspect what it wrote afterwards.
#[derive(Clone)]
pub struct ToolBox {
    root: ProjectRoot,
    tools: Arc<Vec<Box<dyn Tool>>>,
    journal: Arc<RwLock<Vec<WriteRecord>>>,
    calls: Arc<AtomicUsize>,
}

impl ToolBox {
    /// Toolbox with the four coder tools.
    pub fn new(root: ProjectRoot) -> Self {
        Self::with_tools(root, default_tools())
    }

    pub fn with_tools(root: ProjectRoot, tools: Vec<Box<dyn Tool>>) -> Self {
        Self {
            root,
            tools: Arc::new(tools),
            journal: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Specs advertised to the model.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Run a tool and return its text, or the tool error.
    pub fn try_invoke(&self, name: &str, args: &Value) -> ToolResult<String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        self.calls.fetch_add(1, Ordering::SeqCst);
        info!(tool = name, args = %summarize_args(args), "TOOL START");
        let start = Instant::now();

        let result = tool.call(&self.root, args);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                info!(
                    tool = name,
                    elapsed_ms,
                    result_bytes = output.text.len(),
                    "TOOL END"
                );
                if let Some(record) = output.write {
                    self.journal.write().push(record);
                }
                Ok(output.text)
            }
            Err(e) => {
                warn!(tool = name, elapsed_ms, "TOOL ERROR: {}", e);
                Err(e)
            }
        }
    }

    /// Run a tool for the model: errors come back as `ERROR: ...` text.
    pub fn invoke(&self, name: &str, args: &Value) -> String {
        match self.try_invoke(name, args) {
            Ok(text) => text,
            Err(e) => format!("ERROR: {}", e),
        }
    }

    /// Read a file through the `read_file` tool.
    pub fn read_file(&self, path: &str) -> ToolResult<String> {
        self.try_invoke("read_file", &json!({ "path": path }))
    }

    /// Total tool calls made through this toolbox and its clones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn journal(&self) -> Vec<WriteRecord> {
        self.journal.read().clone()
    }

    /// Mark for [`writes_since`](Self::writes_since).
    pub fn journal_len(&self) -> usize {
        self.journal.read().len()
    }

    /// Writes recorded after `mark`.
    pub fn writes_since(&self, mark: usize) -> Vec<WriteRecord> {
        self.journal.read().iter().skip(mark).cloned().collect()
    }
}

impl std::fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBox")
            .field("root", &self.root)
            .field("tools", &self.names())
            .field("writes", &self.journal_len())
            .finish()
    }
}

/// Short `key=value` rendering of tool arguments for logs.
fn summarize_args(args: &Value) -> String {
    match args {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) if s.chars().count() > ARG_PREVIEW_CHARS => {
                        let head: String = s.chars().take(ARG_PREVIEW_CHARS).collect();
                        format!("{}... ({} chars)", head, s.chars().count())
                    }
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{}={}", k, text)
            })
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
