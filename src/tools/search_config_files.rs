//! `search-config-files`: locate configuration files by name or glob.
//!
//! For every requested pattern the root is walked depth-first in name order
//! and the first entry whose name matches wins. Excluded subtrees are pruned,
//! and every visited entry must pass the sandbox; entries that do not are
//! skipped together with everything below them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, trace};
use walkdir::WalkDir;

use super::{Tool, ToolContext, parse_args};
use crate::constants::NOT_FOUND_PLACEHOLDER;
use crate::utils::PathSandbox;

const NAME: &str = "search-config-files";

const NAME_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

const PATH_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    target_config_file_patterns: String,
    #[serde(default)]
    exclude_patterns: String,
}

/// One line of the search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMatch {
    /// The pattern as requested, trimmed.
    pub pattern: String,
    /// Absolute path of the first match, or [`NOT_FOUND_PLACEHOLDER`].
    pub file_path: String,
}

/// A target pattern: matched against entry names.
#[derive(Debug, Clone)]
struct NamePattern {
    raw: String,
    glob: Option<Pattern>,
}

impl NamePattern {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            glob: Pattern::new(raw).ok(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        name.to_lowercase() == self.raw.to_lowercase()
            || self
                .glob
                .as_ref()
                .is_some_and(|glob| glob.matches_with(name, NAME_MATCH))
    }
}

/// Exclusion rules, matched against root-relative paths.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    globs: Vec<Pattern>,
}

impl ExcludeSet {
    /// Build from a comma-separated list.
    ///
    /// A pattern containing `*` is used as a glob. Any other pattern `p`
    /// excludes a path segment named `p` and everything below it.
    pub fn parse(list: &str) -> Self {
        let mut globs = Vec::new();
        for raw in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let sources = if raw.contains('*') {
                vec![raw.to_string()]
            } else {
                let escaped = Pattern::escape(raw);
                vec![format!("**/{escaped}/**"), format!("**/{escaped}")]
            };
            for source in sources {
                match Pattern::new(&source) {
                    Ok(glob) => globs.push(glob),
                    Err(e) => debug!("Ignoring invalid exclude pattern '{}': {}", raw, e),
                }
            }
        }
        Self { globs }
    }

    /// Whether the root-relative `path` is excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy().replace('\\', "/");
        self.globs.iter().any(|glob| glob.matches_with(&text, PATH_MATCH))
    }
}

/// Depth-first, name-ordered search for the first entry matching `pattern`.
fn search(sandbox: &PathSandbox, pattern: &NamePattern, excludes: &ExcludeSet) -> Option<PathBuf> {
    let root = sandbox.root();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if excludes.is_excluded(relative) {
                trace!("Excluded {}", relative.display());
                return false;
            }
            sandbox.resolve(&entry.path().to_string_lossy()).is_ok()
        });

    walker
        .filter_map(|entry| entry.ok())
        .find(|entry| pattern.matches(&entry.file_name().to_string_lossy()))
        .map(walkdir::DirEntry::into_path)
}

/// Searches the root for configuration files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchConfigFilesTool;

impl Tool for SearchConfigFilesTool {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Searches for configuration files within the root directory, based on the provided target \
         configuration file patterns and exclude patterns. Returns a JSON array of \
         { pattern, filePath } objects with \"Not found\" for patterns without a match"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "targetConfigFilePatterns": {
                    "type": "string",
                    "description": "A comma-separated list of configuration file patterns to search for. \
                                    Supports file names (tsconfig.json) and glob patterns \
                                    (webpack.config.*, *.config.js, **/*.config.json)"
                },
                "excludePatterns": {
                    "type": "string",
                    "description": "A comma-separated list of patterns to exclude from the search"
                }
            },
            "required": ["targetConfigFilePatterns", "excludePatterns"]
        })
    }

    fn execute<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, Result<String>> {
        async move {
            let Args {
                target_config_file_patterns,
                exclude_patterns,
            } = parse_args(NAME, args)?;

            let sandbox = ctx.sandbox.clone();
            let excludes = ExcludeSet::parse(&exclude_patterns);
            let patterns: Vec<NamePattern> = target_config_file_patterns
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(NamePattern::new)
                .collect();

            let matches = tokio::task::spawn_blocking(move || {
                patterns
                    .into_iter()
                    .map(|pattern| {
                        let found = search(&sandbox, &pattern, &excludes);
                        ConfigMatch {
                            file_path: found.map_or_else(
                                || NOT_FOUND_PLACEHOLDER.to_string(),
                                |path| path.display().to_string(),
                            ),
                            pattern: pattern.raw,
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .await
            .context("Config file search task failed")?;

            Ok(serde_json::to_string_pretty(&matches)?)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ToolContext) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for dir in ["a/deep", "node_modules/pkg", "packages/web", ".git"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in [
            "a/deep/tsconfig.json",
            "node_modules/pkg/tsconfig.json",
            "packages/web/webpack.config.js",
            "packages/web/Jest.Config.ts",
            ".git/config",
        ] {
            fs::write(root.join(file), "{}").unwrap();
        }
        let ctx = ToolContext::new(PathSandbox::new(root).unwrap(), CacheOptions::default());
        (temp, ctx)
    }

    async fn run(ctx: &ToolContext, targets: &str, excludes: &str) -> Vec<ConfigMatch> {
        let out = SearchConfigFilesTool
            .execute(
                ctx,
                json!({ "targetConfigFilePatterns": targets, "excludePatterns": excludes }),
            )
            .await
            .unwrap();
        serde_json::from_str(&out).unwrap()
    }

    #[tokio::test]
    async fn test_finds_by_name_and_glob() {
        let (_temp, ctx) = fixture();
        let root = ctx.root().to_path_buf();

        let results = run(&ctx, "tsconfig.json, webpack.config.*, jest.config.ts", "node_modules").await;

        assert_eq!(
            results,
            vec![
                ConfigMatch {
                    pattern: "tsconfig.json".to_string(),
                    file_path: root.join("a/deep/tsconfig.json").display().to_string(),
                },
                ConfigMatch {
                    pattern: "webpack.config.*".to_string(),
                    file_path: root.join("packages/web/webpack.config.js").display().to_string(),
                },
                ConfigMatch {
                    pattern: "jest.config.ts".to_string(),
                    file_path: root.join("packages/web/Jest.Config.ts").display().to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_not_found_placeholder() {
        let (_temp, ctx) = fixture();
        let results = run(&ctx, "vite.config.ts", "").await;
        assert_eq!(results[0].file_path, NOT_FOUND_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_exclusions_prune_subtrees() {
        let (_temp, ctx) = fixture();

        let results = run(&ctx, "tsconfig.json,config", "a,.git").await;
        assert_eq!(
            results[0].file_path,
            ctx.root().join("node_modules/pkg/tsconfig.json").display().to_string()
        );
        assert_eq!(results[1].file_path, NOT_FOUND_PLACEHOLDER);

        let results = run(&ctx, "tsconfig.json", "a/**,node_modules/**").await;
        assert_eq!(results[0].file_path, NOT_FOUND_PLACEHOLDER);
    }

    #[test]
    fn test_exclude_set_segments() {
        let excludes = ExcludeSet::parse("node_modules, dist ,*.log");
        assert!(excludes.is_excluded(Path::new("node_modules")));
        assert!(excludes.is_excluded(Path::new("packages/app/node_modules/x/y.json")));
        assert!(excludes.is_excluded(Path::new("debug.log")));
        assert!(excludes.is_excluded(Path::new("dist")));
        assert!(!excludes.is_excluded(Path::new("distribution/x")));
        assert!(!excludes.is_excluded(Path::new("src/index.ts")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_is_skipped() {
        let (temp, ctx) = fixture();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.config.json"), "{}").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.config.json"),
            temp.path().join("linked.config.json"),
        )
        .unwrap();

        let results = run(&ctx, "*.config.json", "").await;
        assert_eq!(results[0].file_path, NOT_FOUND_PLACEHOLDER);
    }
}
