//! Path sandboxing for every externally supplied path.
//!
//! A [`PathSandbox`] is created once per process from the root directory and
//! resolves request paths to absolute paths that are guaranteed, at validation
//! time, to live inside that root. Resolution follows symlinks before the
//! final check so a link inside the root cannot be used to reach files outside
//! it, while targets that do not exist yet are accepted as long as their
//! parent directory is inside the root.
//!
//! # Resolution Steps
//!
//! 1. Expand a leading `~` / `~/` to the home directory
//! 2. Make the path absolute against the process working directory and
//!    collapse `.` / `..` lexically
//! 3. Reject paths whose lexical form is outside the root
//! 4. If the path exists, canonicalize it and re-check the real path
//! 5. Otherwise canonicalize the parent directory, check it, and return the
//!    lexical path
//!
//! Containment is always segment-aware: a root of `/srv/app` does not admit
//! `/srv/app-old`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use crate::constants::MAX_SYMLINK_HOPS;
use crate::core::CodebaseError;
use crate::utils::fs::{is_within, normalize_path};
use crate::utils::platform::expand_home;

/// Resolves and validates paths against a fixed root directory.
///
/// Cloning is cheap; the root is shared.
///
/// # Examples
///
/// ```rust,no_run
/// use codebase_mcp::utils::PathSandbox;
///
/// # fn example() -> Result<(), codebase_mcp::core::CodebaseError> {
/// let sandbox = PathSandbox::new("/home/user/project")?;
/// let resolved = sandbox.resolve("/home/user/project/src/index.ts")?;
/// assert!(resolved.starts_with(sandbox.root()));
///
/// // Escapes are rejected
/// assert!(sandbox.resolve("/etc/passwd").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PathSandbox {
    root: Arc<PathBuf>,
}

impl PathSandbox {
    /// Create a sandbox rooted at `root`.
    ///
    /// The root is tilde-expanded, made absolute, canonicalized, and must be an
    /// existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`CodebaseError::InvalidRoot`] if the root cannot be resolved or
    /// is not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, CodebaseError> {
        let root = root.as_ref();
        let invalid = |reason: String| CodebaseError::InvalidRoot {
            path: root.display().to_string(),
            reason,
        };

        let absolute = absolute_path(&root.to_string_lossy()).map_err(|e| invalid(e.to_string()))?;
        let canonical = std::fs::canonicalize(&absolute).map_err(|e| invalid(e.to_string()))?;
        if !canonical.is_dir() {
            return Err(invalid("not a directory".to_string()));
        }

        Ok(Self {
            root: Arc::new(canonical),
        })
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` (already absolute and normalized) is inside the root.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        is_within(path, &self.root)
    }

    /// Resolve `requested` to a path inside the root.
    ///
    /// Returns the real path for existing targets, or the lexical absolute
    /// path for targets that do not exist yet but whose parent does.
    ///
    /// # Errors
    ///
    /// - [`CodebaseError::AccessDenied`] if the lexical path, the symlink
    ///   target, or the parent directory lies outside the root
    /// - [`CodebaseError::ParentMissing`] if the target does not exist and
    ///   its parent cannot be resolved
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, CodebaseError> {
        let absolute = absolute_path(requested).map_err(|e| CodebaseError::Io {
            operation: "resolve path".to_string(),
            path: requested.to_string(),
            message: e.to_string(),
        })?;

        if !self.contains(&absolute) {
            return Err(CodebaseError::AccessDenied {
                path: absolute.display().to_string(),
                reason: format!(
                    "path outside root directory (not in {})",
                    self.root.display()
                ),
            });
        }

        match std::fs::canonicalize(&absolute) {
            Ok(real) => {
                if !self.contains(&real) {
                    return Err(CodebaseError::access_denied(
                        &real,
                        "symlink target outside root directory",
                    ));
                }
                trace!("Resolved {} to {}", requested, real.display());
                Ok(real)
            }
            Err(_) => {
                self.check_dangling_link(&absolute)?;
                self.check_parent(&absolute)?;
                trace!("Resolved not-yet-existing {} to {}", requested, absolute.display());
                Ok(absolute)
            }
        }
    }

    /// Async wrapper around [`resolve`](Self::resolve) that runs the
    /// filesystem calls on the blocking pool.
    pub async fn resolve_async(&self, requested: &str) -> Result<PathBuf, CodebaseError> {
        let sandbox = self.clone();
        let requested = requested.to_string();
        let path_for_error = requested.clone();
        tokio::task::spawn_blocking(move || sandbox.resolve(&requested))
            .await
            .map_err(|e| CodebaseError::Io {
                operation: "resolve path".to_string(),
                path: path_for_error,
                message: e.to_string(),
            })?
    }

    /// A symlink whose target is missing cannot be canonicalized, so follow
    /// the chain lexically and check every hop instead of trusting the parent
    /// check alone.
    fn check_dangling_link(&self, absolute: &Path) -> Result<(), CodebaseError> {
        let mut current = absolute.to_path_buf();
        for _ in 0..MAX_SYMLINK_HOPS {
            let is_link = std::fs::symlink_metadata(&current)
                .map(|meta| meta.file_type().is_symlink())
                .unwrap_or(false);
            if !is_link {
                return Ok(());
            }

            let target = std::fs::read_link(&current)
                .map_err(|e| CodebaseError::io("read link", &current, &e))?;
            let target = match current.parent() {
                Some(parent) if target.is_relative() => normalize_path(&parent.join(target)),
                _ => normalize_path(&target),
            };
            if !self.contains(&target) {
                return Err(CodebaseError::access_denied(
                    absolute,
                    "symlink target outside root directory",
                ));
            }
            current = target;
        }

        Err(CodebaseError::access_denied(absolute, "too many levels of symbolic links"))
    }

    fn check_parent(&self, absolute: &Path) -> Result<(), CodebaseError> {
        let parent = absolute.parent().ok_or_else(|| CodebaseError::ParentMissing {
            parent: absolute.display().to_string(),
        })?;

        let real_parent =
            std::fs::canonicalize(parent).map_err(|_| CodebaseError::ParentMissing {
                parent: parent.display().to_string(),
            })?;

        if self.contains(&real_parent) {
            Ok(())
        } else {
            Err(CodebaseError::access_denied(
                &real_parent,
                "parent directory outside root directory",
            ))
        }
    }
}

/// Expand `~`, make absolute against the working directory, and normalize.
///
/// # Errors
///
/// Fails if the home directory or the working directory cannot be determined.
pub fn absolute_path(path: &str) -> io::Result<PathBuf> {
    let expanded = expand_home(path).map_err(io::Error::other)?;
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };
    Ok(normalize_path(&absolute))
}
