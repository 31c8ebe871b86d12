//! Dependency extraction for JavaScript/TypeScript projects.
//!
//! A [`DependencyExtractor`] turns a start file into a nested
//! [`DependencyTree`] of the files it transitively imports. The tree has a
//! single top-level key, the start file, and every value is the map of that
//! file's own imports.
//!
//! The built-in [`ImportScanner`] scans sources lexically (see [`scanner`]) and
//! resolves specifiers on disk (see [`resolve`]). Webpack and RequireJS
//! configuration files are accepted for interface compatibility but are not
//! evaluated; only tsconfig path mapping influences resolution.
//!
//! # Cycles and sharing
//!
//! Each file's imports are written out once, under its first occurrence.
//! Every later occurrence is an empty object: a file still on the import
//! stack closes a cycle, and a finished file has its subtree earlier in the
//! tree. [`crate::graph`] expands such references from the first occurrence,
//! so the tree stays linear in the number of import edges no matter how
//! often files are shared.

pub mod resolve;
pub mod scanner;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

pub use crate::graph::DependencyTree;
use crate::core::CodebaseError;
use resolve::{Resolver, TsPathConfig, is_script};
use scanner::scan_specifiers;

/// Inputs of one extraction run. All paths are already sandbox-resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// File to start from.
    pub start_file: PathBuf,
    /// Project root; nothing outside it is ever yielded.
    pub root_dir: PathBuf,
    /// RequireJS configuration file.
    pub require_config: Option<PathBuf>,
    /// Webpack configuration file.
    pub webpack_config: Option<PathBuf>,
    /// TypeScript configuration file.
    pub ts_config: Option<PathBuf>,
}

impl ExtractOptions {
    /// Options with only the start file and root set.
    pub fn new(start_file: impl Into<PathBuf>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            start_file: start_file.into(),
            root_dir: root_dir.into(),
            require_config: None,
            webpack_config: None,
            ts_config: None,
        }
    }
}

/// Produces the raw nested dependency tree for a start file.
///
/// Implementations are synchronous; async callers go through [`extract_async`].
pub trait DependencyExtractor: Send + Sync {
    /// Build the dependency tree rooted at `options.start_file`.
    ///
    /// # Errors
    ///
    /// [`CodebaseError::ExtractorFailure`] when no tree can be produced.
    fn extract(&self, options: &ExtractOptions) -> Result<DependencyTree, CodebaseError>;
}

/// Run `extractor` on the blocking thread pool.
///
/// # Errors
///
/// Whatever the extractor returns, or [`CodebaseError::ExtractorFailure`] if
/// the blocking task panicked.
pub async fn extract_async(
    extractor: Arc<dyn DependencyExtractor>,
    options: ExtractOptions,
) -> Result<DependencyTree, CodebaseError> {
    let file = options.start_file.display().to_string();
    tokio::task::spawn_blocking(move || extractor.extract(&options))
        .await
        .map_err(|e| CodebaseError::ExtractorFailure {
            file,
            reason: e.to_string(),
        })?
}

/// Regex-based import scanner with on-disk resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportScanner;

impl ImportScanner {
    /// Create a scanner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DependencyExtractor for ImportScanner {
    fn extract(&self, options: &ExtractOptions) -> Result<DependencyTree, CodebaseError> {
        let start = &options.start_file;
        let failure = |reason: String| CodebaseError::ExtractorFailure {
            file: start.display().to_string(),
            reason,
        };

        let source = std::fs::read_to_string(start)
            .map_err(|e| failure(format!("cannot read start file: {e}")))?;

        let ts_paths = options
            .ts_config
            .as_deref()
            .map(TsPathConfig::load)
            .transpose()?;
        for config in [&options.require_config, &options.webpack_config].into_iter().flatten() {
            debug!("Bundler config {} accepted but not evaluated", config.display());
        }

        let mut walk = Walk {
            resolver: Resolver::new(&options.root_dir, ts_paths),
            stack: HashSet::new(),
            finished: HashSet::new(),
        };
        let subtree = walk.visit(start, Some(source)).map_err(|e| failure(e.to_string()))?;

        info!(
            "Extracted dependencies of {} ({} distinct files)",
            start.display(),
            walk.finished.len()
        );

        let mut tree = Map::new();
        tree.insert(start.display().to_string(), subtree);
        Ok(tree)
    }
}

struct Walk {
    resolver: Resolver,
    stack: HashSet<PathBuf>,
    finished: HashSet<PathBuf>,
}

impl Walk {
    fn visit(&mut self, file: &Path, source: Option<String>) -> Result<Value, regex::Error> {
        if self.finished.contains(file) {
            return Ok(Value::Object(Map::new()));
        }

        let source = match source {
            Some(source) => Some(source),
            None if is_script(file) => match std::fs::read_to_string(file) {
                Ok(text) => Some(text),
                Err(e) => {
                    debug!("Skipping unreadable dependency {}: {}", file.display(), e);
                    None
                }
            },
            None => None,
        };

        let mut children = Map::new();
        if let Some(source) = source {
            self.stack.insert(file.to_path_buf());
            for specifier in scan_specifiers(&source)? {
                let Some(dependency) = self.resolver.resolve(&specifier, file) else {
                    continue;
                };
                let key = dependency.display().to_string();
                if children.contains_key(&key) {
                    continue;
                }
                let subtree = if self.stack.contains(&dependency) {
                    Value::Object(Map::new())
                } else {
                    self.visit(&dependency, None)?
                };
                children.insert(key, subtree);
            }
            self.stack.remove(file);
        }

        self.finished.insert(file.to_path_buf());
        Ok(Value::Object(children))
    }
}
