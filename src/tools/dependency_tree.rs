//! `get-dependency-tree`: flattened import graph of a start file, cached.
//!
//! Results are cached per resolved start file in a namespace derived from the
//! tool name and the config files supplied, so the same start file analysed
//! with a different tsconfig never shares an entry. Cache entries are
//! validated against the start file's fingerprint.

use anyhow::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{Tool, ToolContext, parse_args};
use crate::extractor::{ExtractOptions, extract_async};

const NAME: &str = "get-dependency-tree";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    file_path: String,
    require_config: Option<String>,
    webpack_config: Option<String>,
    ts_config: Option<String>,
}

/// Extracts, flattens, and caches the dependency graph of a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDependencyTreeTool;

impl Tool for GetDependencyTreeTool {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Traverses the dependency tree starting from the given file and returns every reachable \
         file once, with a numeric id, the ids of the files that import it, and its content. \
         Optionally accepts paths to RequireJS, Webpack, and TypeScript configuration files"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "The path to the starting file for traversing the dependency tree"
                },
                "requireConfig": {
                    "type": "string",
                    "description": "The path to the RequireJS configuration file"
                },
                "webpackConfig": {
                    "type": "string",
                    "description": "The path to the Webpack configuration file"
                },
                "tsConfig": {
                    "type": "string",
                    "description": "The path to the TypeScript configuration file"
                }
            },
            "required": ["filePath"]
        })
    }

    fn execute<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, Result<String>> {
        async move {
            let args: Args = parse_args(NAME, args)?;

            let start_file = ctx.sandbox.resolve_async(&args.file_path).await?;
            let mut options = ExtractOptions::new(&start_file, ctx.root());
            let mut namespace = NAME.to_string();
            for (label, requested, slot) in [
                ("require", &args.require_config, &mut options.require_config),
                ("webpack", &args.webpack_config, &mut options.webpack_config),
                ("ts", &args.ts_config, &mut options.ts_config),
            ] {
                if let Some(requested) = requested {
                    let resolved = ctx.sandbox.resolve_async(requested).await?;
                    namespace.push_str(&format!("|{label}={}", resolved.display()));
                    *slot = Some(resolved);
                }
            }

            let key = start_file.display().to_string();
            if let Some(nodes) = ctx.dependency_cache.get(&key, Some(&namespace)).await {
                debug!("Dependency graph cache hit for {}", key);
                return Ok(serde_json::to_string_pretty(nodes.as_ref())?);
            }

            let tree = extract_async(ctx.extractor.clone(), options).await?;
            let nodes = ctx.graph.flatten(&tree).await;
            info!("Built dependency graph for {} with {} nodes", key, nodes.len());

            let nodes = ctx.dependency_cache.set(&key, nodes, Some(&namespace)).await;
            Ok(serde_json::to_string_pretty(nodes.as_ref())?)
        }
        .boxed()
    }
}
