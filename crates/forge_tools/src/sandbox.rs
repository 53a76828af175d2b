//! Project root sandbox.
//!
//! Every path a tool touches is resolved against the project root and
//! rejected if it lands outside of it. Resolution is lexical (`..` is
//! folded before the check), then the deepest existing ancestor is checked
//! again after following symlinks.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{ToolError, ToolResult};

/// Default directory name for generated projects, relative to the cwd.
pub const DEFAULT_PROJECT_DIR: &str = "generated_project";

/// The directory generated files are confined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    /// Create the directory if needed and anchor the sandbox there.
    pub fn init(dir: impl AsRef<Path>) -> ToolResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let root = dir.canonicalize()?;
        Ok(Self { root })
    }

    /// `dir` resolved against the current working directory.
    pub fn in_cwd(dir: impl AsRef<Path>) -> ToolResult<Self> {
        let cwd = std::env::current_dir()?;
        Self::init(cwd.join(dir))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute path for `path`, which may be relative to the root or
    /// absolute inside it.
    pub fn resolve(&self, path: &str) -> ToolResult<PathBuf> {
        let candidate = Path::new(path.trim());
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let resolved = normalize(&joined);
        if !resolved.starts_with(&self.root) {
            return Err(ToolError::outside(path, &self.root));
        }

        self.check_real_path(path, &resolved)?;
        Ok(resolved)
    }

    /// Reject paths whose existing part leaves the root through a symlink.
    fn check_real_path(&self, path: &str, resolved: &Path) -> ToolResult<()> {
        let mut existing = resolved;
        while !existing.exists() {
            // Dangling symlink: its target cannot be checked.
            if fs::symlink_metadata(existing).is_ok() {
                return Err(ToolError::outside(path, &self.root));
            }
            match existing.parent() {
                Some(parent) => existing = parent,
                None => return Ok(()),
            }
        }

        let real = existing.canonicalize()?;
        if real.starts_with(&self.root) {
            Ok(())
        } else {
            Err(ToolError::outside(path, &self.root))
        }
    }

    /// Root-relative form of an absolute path inside the root, `/`-separated.
    pub fn relative(&self, absolute: &Path) -> String {
        let rel = absolute.strip_prefix(&self.root).unwrap_or(absolute);
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join("/")
        }
    }

    /// Canonical root-relative key for `path`, used to compare a step's
    /// target with journal entries.
    pub fn normalize(&self, path: &str) -> ToolResult<String> {
        let resolved = self.resolve(path)?;
        Ok(self.relative(&resolved))
    }
}

/// Fold `.` and `..` without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, ProjectRoot) {
        let temp = TempDir::new().unwrap();
        let root = ProjectRoot::init(temp.path().join("generated_project")).unwrap();
        (temp, root)
    }

    #[test]
    fn test_init_creates_directory() {
        let (_temp, root) = sandbox();
        assert!(root.path().is_dir());
        assert!(root.path().is_absolute());
    }

    #[test]
    fn test_resolve_inside_root() {
        let (_temp, root) = sandbox();
        let path = root.resolve("src/./app.js").unwrap();
        assert_eq!(path, root.path().join("src").join("app.js"));

        let path = root.resolve("src/../index.html").unwrap();
        assert_eq!(path, root.path().join("index.html"));

        let abs = root.path().join("style.css");
        assert_eq!(root.resolve(abs.to_str().unwrap()).unwrap(), abs);
    }

    #[test]
    fn test_resolve_rejects_escape() {
        let (_temp, root) = sandbox();
        assert!(matches!(
            root.resolve("../outside.txt"),
            Err(ToolError::PathOutsideRoot { .. })
        ));
        assert!(matches!(
            root.resolve("a/../../b"),
            Err(ToolError::PathOutsideRoot { .. })
        ));
        assert!(matches!(
            root.resolve("/etc/passwd"),
            Err(ToolError::PathOutsideRoot { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let (temp, root) = sandbox();
        let outside = temp.path().join("secret");
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.path().join("link")).unwrap();

        assert!(matches!(
            root.resolve("link"),
            Err(ToolError::PathOutsideRoot { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_new_file_under_symlinked_dir() {
        let (temp, root) = sandbox();
        let outside = temp.path().join("secret");
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.path().join("link")).unwrap();

        assert!(matches!(
            root.resolve("link/new.txt"),
            Err(ToolError::PathOutsideRoot { .. })
        ));
        assert!(matches!(
            root.resolve("link/deeper/new.txt"),
            Err(ToolError::PathOutsideRoot { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_dangling_symlink() {
        let (temp, root) = sandbox();
        let target = temp.path().join("not_yet");
        std::os::unix::fs::symlink(&target, root.path().join("dangling")).unwrap();

        assert!(matches!(
            root.resolve("dangling"),
            Err(ToolError::PathOutsideRoot { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_allows_symlink_inside_root() {
        let (_temp, root) = sandbox();
        fs::create_dir_all(root.path().join("src")).unwrap();
        std::os::unix::fs::symlink(root.path().join("src"), root.path().join("alias")).unwrap();

        let path = root.resolve("alias/new.js").unwrap();
        assert_eq!(path, root.path().join("alias").join("new.js"));
    }

    #[test]
    fn test_resolve_new_nested_path() {
        let (_temp, root) = sandbox();
        let path = root.resolve("a/b/c.txt").unwrap();
        assert_eq!(path, root.path().join("a").join("b").join("c.txt"));
    }

    #[test]
    fn test_normalize_key() {
        let (_temp, root) = sandbox();
        assert_eq!(root.normalize("./js/app.js").unwrap(), "js/app.js");
        assert_eq!(root.normalize("js//app.js").unwrap(), "js/app.js");
        assert_eq!(root.normalize(".").unwrap(), ".");
    }
}
