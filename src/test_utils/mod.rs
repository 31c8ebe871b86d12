//! Test utilities for codebase-mcp
//!
//! Helpers shared by unit tests and the integration suite: one-time logging
//! setup and [`TestProject`], a throwaway project directory with a ready
//! [`ToolContext`].
//!
//! # Example
//!
//! ```rust,no_run
//! use codebase_mcp::test_utils::TestProject;
//!
//! let project = TestProject::new().unwrap();
//! project.write("src/index.ts", "import './a';").unwrap();
//! project.write("src/a.ts", "export {};").unwrap();
//! assert!(project.path("src/a.ts").exists());
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::cache::CacheOptions;
use crate::server::Server;
use crate::tools::{ToolContext, ToolRegistry};
use crate::utils::PathSandbox;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. With `level` set, that level is used;
/// otherwise logging is enabled only when `RUST_LOG` is present.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A temporary project directory.
///
/// The directory is canonicalized on creation so paths built from
/// [`root`](Self::root) compare equal to what the sandbox reports, even on
/// platforms where the temp dir sits behind a symlink (`/tmp` on macOS).
pub struct TestProject {
    _temp: TempDir,
    root: PathBuf,
}

impl TestProject {
    /// Create an empty project.
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().context("Failed to create temp dir")?;
        let root = temp
            .path()
            .canonicalize()
            .context("Failed to canonicalize temp dir")?;
        Ok(Self { _temp: temp, root })
    }

    /// Canonical project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `relative` inside the project.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Absolute path of `relative` as a string, ready to put in tool arguments.
    pub fn arg(&self, relative: &str) -> String {
        self.path(relative).display().to_string()
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Create the directory `relative` and its parents.
    pub fn mkdir(&self, relative: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        fs::create_dir_all(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(path)
    }

    /// Sandbox rooted at the project.
    pub fn sandbox(&self) -> Result<PathSandbox> {
        Ok(PathSandbox::new(&self.root)?)
    }

    /// Tool context with default cache options.
    pub fn context(&self) -> Result<ToolContext> {
        self.context_with(CacheOptions::default())
    }

    /// Tool context with the given cache options.
    pub fn context_with(&self, options: CacheOptions) -> Result<ToolContext> {
        Ok(ToolContext::new(self.sandbox()?, options))
    }

    /// A server over the default context.
    pub fn server(&self) -> Result<Server> {
        Ok(Server::new(ToolRegistry::new(self.context()?)))
    }
}
