//! `list-directory`: one line per entry of a directory inside the root.

use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Tool, ToolContext, parse_args};
use crate::core::CodebaseError;

const NAME: &str = "list-directory";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    directory_path: String,
}

/// Lists a directory with `[DIR]` / `[FILE]` prefixes, sorted by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListDirectoryTool;

impl Tool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Lists the contents of a specified directory. Returns a detailed listing of all files and \
         directories within the specified path, clearly distinguishing between files and directories \
         with [FILE] and [DIR] prefixes. Only works within root directory"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directoryPath": {
                    "type": "string",
                    "description": "The path to the directory to list."
                }
            },
            "required": ["directoryPath"]
        })
    }

    fn execute<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, Result<String>> {
        async move {
            let Args { directory_path } = parse_args(NAME, args)?;
            let directory = ctx.sandbox.resolve_async(&directory_path).await?;

            let mut reader = tokio::fs::read_dir(&directory)
                .await
                .map_err(|e| CodebaseError::io("list directory", &directory, &e))?;

            let mut entries = Vec::new();
            while let Some(entry) = reader
                .next_entry()
                .await
                .with_context(|| format!("Failed to read entries of {}", directory.display()))?
            {
                let is_dir = entry.file_type().await.is_ok_and(|kind| kind.is_dir());
                entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
            }
            entries.sort();

            Ok(entries
                .into_iter()
                .map(|(name, is_dir)| format!("{} {name}", if is_dir { "[DIR]" } else { "[FILE]" }))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        .boxed()
    }
}
