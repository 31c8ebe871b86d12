//! `read-file-with-metadata`: file text plus stat information.

use std::fs::Metadata;
use std::time::SystemTime;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{Tool, ToolContext, parse_args};
use crate::core::CodebaseError;

const NAME: &str = "read-file-with-metadata";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    file_path: String,
}

/// Stat information reported alongside the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Size in bytes.
    pub size: u64,
    /// Creation time, if the platform records it.
    pub created: Option<String>,
    /// Last modification time.
    pub modified: Option<String>,
    /// Last access time.
    pub accessed: Option<String>,
    /// Whether the path is a directory.
    pub is_directory: bool,
    /// Whether the path is a regular file.
    pub is_file: bool,
    /// Last three octal digits of the mode, e.g. `"644"`.
    pub permissions: String,
}

impl FileMetadata {
    /// Convert filesystem metadata; timestamps are RFC 3339 UTC with milliseconds.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            size: metadata.len(),
            created: metadata.created().ok().map(format_time),
            modified: metadata.modified().ok().map(format_time),
            accessed: metadata.accessed().ok().map(format_time),
            is_directory: metadata.is_dir(),
            is_file: metadata.is_file(),
            permissions: permission_digits(metadata),
        }
    }
}

#[derive(Serialize)]
struct FileWithMetadata {
    content: String,
    metadata: FileMetadata,
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(unix)]
fn permission_digits(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let octal = format!("{:o}", metadata.permissions().mode());
    octal[octal.len().saturating_sub(3)..].to_string()
}

#[cfg(not(unix))]
fn permission_digits(metadata: &Metadata) -> String {
    if metadata.permissions().readonly() { "444" } else { "666" }.to_string()
}

/// Reads a file and reports its metadata as pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadFileWithMetadataTool;

impl Tool for ReadFileWithMetadataTool {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Reads the content of a specified file and retrieves its metadata. Returns the file content \
         and metadata as a JSON object with 2-space indentation. Metadata includes size, creation \
         time, last modified time, last access time, permissions, and type. Only works within root \
         directory"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "The path to the file to read and get metadata for"
                }
            },
            "required": ["filePath"]
        })
    }

    fn execute<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, Result<String>> {
        async move {
            let Args { file_path } = parse_args(NAME, args)?;
            let path = ctx.sandbox.resolve_async(&file_path).await?;

            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| CodebaseError::io("read file", &path, &e))?;
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|e| CodebaseError::io("stat", &path, &e))?;

            let result = FileWithMetadata {
                content,
                metadata: FileMetadata::from_metadata(&metadata),
            };
            Ok(serde_json::to_string_pretty(&result)?)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use crate::utils::PathSandbox;
    use std::fs;
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> ToolContext {
        ToolContext::new(PathSandbox::new(temp.path()).unwrap(), CacheOptions::default())
    }

    #[tokio::test]
    async fn test_reads_content_and_metadata() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let file = ctx.root().join("index.ts");
        fs::write(&file, "export const x = 1;\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();
        }

        let out = ReadFileWithMetadataTool
            .execute(&ctx, json!({ "filePath": file.display().to_string() }))
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(parsed["content"], "export const x = 1;\n");
        assert_eq!(parsed["metadata"]["size"], 20);
        assert_eq!(parsed["metadata"]["isFile"], true);
        assert_eq!(parsed["metadata"]["isDirectory"], false);
        #[cfg(unix)]
        assert_eq!(parsed["metadata"]["permissions"], "640");

        let modified = parsed["metadata"]["modified"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(modified).is_ok());
        assert!(modified.ends_with('Z'));
        assert!(out.contains("\n  \"content\""));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);

        let err = ReadFileWithMetadataTool
            .execute(&ctx, json!({ "filePath": ctx.root().join("nope.ts").display().to_string() }))
            .await
            .unwrap_err();

        assert!(matches!(err.downcast_ref::<CodebaseError>(), Some(CodebaseError::Io { .. })));
    }

    #[tokio::test]
    async fn test_traversal_is_denied() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let escape = format!("{}/../../etc/passwd", ctx.root().display());

        let err = ReadFileWithMetadataTool
            .execute(&ctx, json!({ "filePath": escape }))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CodebaseError>(),
            Some(CodebaseError::AccessDenied { .. })
        ));
    }
}
