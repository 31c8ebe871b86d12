//! `get-project-basics`: package.json summary plus the top of the directory tree.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use walkdir::WalkDir;

use super::{Tool, ToolContext, parse_args};
use crate::constants::PROJECT_BASICS_MAX_DEPTH;
use crate::core::CodebaseError;

const NAME: &str = "get-project-basics";

#[derive(Debug, Default, Deserialize)]
struct Args {}

/// The subset of `package.json` that is reported.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    name: Option<Value>,
    version: Option<Value>,
    description: Option<Value>,
    main: Option<Value>,
    #[serde(rename = "type")]
    module_type: Option<Value>,
    dependencies: Option<Map<String, Value>>,
    dev_dependencies: Option<Map<String, Value>>,
}

/// Dependency names in file order; a missing or `null` field has none.
fn dependency_names(field: Option<Map<String, Value>>) -> Vec<String> {
    field.map(|deps| deps.into_iter().map(|(name, _)| name).collect()).unwrap_or_default()
}

/// Tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBasics {
    /// `name` from package.json.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    /// `version` from package.json.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    /// `description` from package.json.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    /// `main` from package.json.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<Value>,
    /// `type` from package.json.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub module_type: Option<Value>,
    /// Names of runtime dependencies, in file order.
    pub dependencies: Vec<String>,
    /// Names of development dependencies, in file order.
    pub dev_dependencies: Vec<String>,
    /// Root-relative directory paths keyed by depth (`"1"`, `"2"`).
    pub directories: BTreeMap<String, Vec<String>>,
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Directories up to [`PROJECT_BASICS_MAX_DEPTH`], grouped by depth.
///
/// Hidden directories are listed but never descended into. A depth key is
/// present as soon as that level was scanned, even if it holds nothing.
pub fn directories_by_depth(root: &Path) -> BTreeMap<String, Vec<String>> {
    let mut directories: BTreeMap<String, Vec<String>> = BTreeMap::new();
    directories.insert("1".to_string(), Vec::new());

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(PROJECT_BASICS_MAX_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let under_hidden = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|name| is_hidden(&name.to_string_lossy()));
            entry.depth() == 1 || !under_hidden
        });

    for entry in walker.filter_map(|entry| entry.ok()) {
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.depth() == 1 && !is_hidden(&entry.file_name().to_string_lossy()) {
            directories.entry("2".to_string()).or_default();
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        directories
            .entry(entry.depth().to_string())
            .or_default()
            .push(relative.to_string_lossy().replace('\\', "/"));
    }
    directories
}

/// Summarizes package.json and the top-level layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetProjectBasicsTool;

impl Tool for GetProjectBasicsTool {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Quickly retrieves essential project information including package.json details and main \
         directory structure"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn execute<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, Result<String>> {
        async move {
            let Args {} = parse_args(NAME, args)?;

            let manifest = ctx
                .sandbox
                .resolve_async(&ctx.root().join("package.json").to_string_lossy())
                .await?;
            let text = tokio::fs::read_to_string(&manifest)
                .await
                .map_err(|e| CodebaseError::io("read", &manifest, &e))?;
            let package: PackageJson = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", manifest.display()))?;

            let root = ctx.root().to_path_buf();
            let directories = tokio::task::spawn_blocking(move || directories_by_depth(&root))
                .await
                .context("Directory scan task failed")?;

            let basics = ProjectBasics {
                name: package.name,
                version: package.version,
                description: package.description,
                main: package.main,
                module_type: package.module_type,
                dependencies: dependency_names(package.dependencies),
                dev_dependencies: dependency_names(package.dev_dependencies),
                directories,
            };
            Ok(serde_json::to_string_pretty(&basics)?)
        }
        .boxed()
    }
}
