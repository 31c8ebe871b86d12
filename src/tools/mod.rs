//! The filesystem-inspection tools exposed to clients.
//!
//! Each tool implements [`Tool`]: a name, a description, a JSON schema for its
//! arguments, and an async `execute` that returns the text payload of a
//! successful call. The [`ToolRegistry`] owns the shared [`ToolContext`],
//! dispatches calls by name, and turns failures into error results so a
//! failing tool never takes the server down.
//!
//! | Tool | Module |
//! |------|--------|
//! | `get-project-basics` | [`project_basics`] |
//! | `search-config-files` | [`search_config_files`] |
//! | `get-dependency-tree` | [`dependency_tree`] |
//! | `list-directory` | [`list_directory`] |
//! | `read-file-with-metadata` | [`read_file`] |

pub mod dependency_tree;
pub mod list_directory;
pub mod project_basics;
pub mod read_file;
pub mod search_config_files;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheOptions, ResultCache};
use crate::core::CodebaseError;
use crate::extractor::{DependencyExtractor, ImportScanner};
use crate::graph::{DependencyGraphBuilder, DependencyNode};
use crate::utils::PathSandbox;

pub use dependency_tree::GetDependencyTreeTool;
pub use list_directory::ListDirectoryTool;
pub use project_basics::GetProjectBasicsTool;
pub use read_file::ReadFileWithMetadataTool;
pub use search_config_files::SearchConfigFilesTool;

/// State shared by every tool invocation.
pub struct ToolContext {
    /// Sandbox every request path goes through.
    pub sandbox: PathSandbox,
    /// Flattened dependency graphs keyed by start file.
    pub dependency_cache: ResultCache<Vec<DependencyNode>>,
    /// Produces raw dependency trees.
    pub extractor: Arc<dyn DependencyExtractor>,
    /// Flattens raw trees and attaches content.
    pub graph: DependencyGraphBuilder,
}

impl ToolContext {
    /// Context rooted at the sandbox root, using the built-in [`ImportScanner`].
    pub fn new(sandbox: PathSandbox, cache_options: CacheOptions) -> Self {
        let dependency_cache = ResultCache::with_options(sandbox.root(), cache_options);
        Self {
            sandbox,
            dependency_cache,
            extractor: Arc::new(ImportScanner::new()),
            graph: DependencyGraphBuilder::new(),
        }
    }

    /// Replace the dependency extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn DependencyExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }
}

/// A callable tool.
pub trait Tool: Send + Sync {
    /// Unique tool name used in `tools/call`.
    fn name(&self) -> &'static str;

    /// Human-readable description advertised in `tools/list`.
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object.
    fn input_schema(&self) -> Value;

    /// Run the tool and return the text payload.
    fn execute<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, Result<String>>;
}

/// One item of a tool result's `content` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    /// Always `"text"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The payload.
    pub text: String,
}

/// Result of a `tools/call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Output items; tools here always produce exactly one.
    pub content: Vec<TextContent>,
    /// Present and `true` when the tool failed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    /// A successful result carrying `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// A failed result for `tool`.
    pub fn error(tool: &str, error: &anyhow::Error) -> Self {
        Self {
            is_error: true,
            ..Self::text(format!("Error running {tool}: {error:#}"))
        }
    }
}

/// Deserialize tool arguments into their typed form.
///
/// # Errors
///
/// [`CodebaseError::InvalidArguments`] naming `tool` if `args` does not fit `T`.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, CodebaseError> {
    let args = if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| CodebaseError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// All tools plus the context they run in.
pub struct ToolRegistry {
    context: Arc<ToolContext>,
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the five built-in tools.
    pub fn new(context: ToolContext) -> Self {
        Self {
            context: Arc::new(context),
            tools: vec![
                Arc::new(GetProjectBasicsTool),
                Arc::new(SearchConfigFilesTool),
                Arc::new(GetDependencyTreeTool),
                Arc::new(ListDirectoryTool),
                Arc::new(ReadFileWithMetadataTool),
            ],
        }
    }

    /// The shared context.
    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// `tools/list` entries: `{ name, description, inputSchema }`.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect()
    }

    /// Run the tool called `name`.
    ///
    /// Tool failures become an error [`CallToolResult`]; only an unknown name
    /// is reported as `Err`.
    ///
    /// # Errors
    ///
    /// [`CodebaseError::UnknownTool`] if no tool has that name.
    pub async fn call(&self, name: &str, args: Value) -> Result<CallToolResult, CodebaseError> {
        let tool = self.get(name).ok_or_else(|| CodebaseError::UnknownTool {
            name: name.to_string(),
        })?;

        match tool.execute(&self.context, args).await {
            Ok(text) => {
                debug!("Tool {} returned {} bytes", name, text.len());
                Ok(CallToolResult::text(text))
            }
            Err(e) => {
                warn!("Tool {} failed: {:#}", name, e);
                Ok(CallToolResult::error(name, &e))
            }
        }
    }
}
