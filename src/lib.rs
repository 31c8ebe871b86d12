//! codebase-mcp - sandboxed codebase inspection for coding agents
//!
//! A Model Context Protocol server that exposes a handful of read-only tools
//! over a single project directory. A client (usually an AI coding agent)
//! launches the binary with the project root as its only argument and talks
//! newline-delimited JSON-RPC over stdin/stdout.
//!
//! # Architecture Overview
//!
//! Every path a client sends goes through the [`utils::PathSandbox`] before
//! the filesystem is touched. The sandbox resolves symlinks and rejects
//! anything that lands outside the root, so a request can never read
//! `/etc/passwd` through `../` or a planted link.
//!
//! The expensive operation, building a file's dependency graph, is split in
//! two stages and cached:
//!
//! 1. An [`extractor::DependencyExtractor`] produces a nested tree of import
//!    relationships starting from one file.
//! 2. The [`graph::DependencyGraphBuilder`] flattens that tree into numbered
//!    nodes with parent links and file contents.
//!
//! The flattened result is kept in a [`cache::ResultCache`] keyed by the
//! start file and validated against a content fingerprint, so repeated
//! queries are answered without re-reading the project until something
//! changes on disk.
//!
//! # Core Modules
//!
//! - [`cache`] - fingerprint-validated result cache with background cleanup
//! - [`cli`] - command-line parsing and server startup
//! - [`config`] - optional TOML configuration
//! - [`core`] - error types and user-facing error formatting
//! - [`extractor`] - import scanning and module resolution
//! - [`graph`] - dependency tree flattening
//! - [`server`] - JSON-RPC transport and request dispatch
//! - [`tools`] - the tool implementations and registry
//! - [`utils`] - path sandboxing and platform helpers
//!
//! # Tools
//!
//! | Tool | Purpose |
//! |------|---------|
//! | `get-project-basics` | `package.json` summary plus a two-level directory map |
//! | `search-config-files` | glob search for config files with exclusions |
//! | `get-dependency-tree` | flattened import graph of a script file |
//! | `list-directory` | `[DIR]`/`[FILE]` listing of one directory |
//! | `read-file-with-metadata` | file content plus size, timestamps and permissions |
//!
//! # Example
//!
//! ```bash
//! codebase-mcp ~/projects/web-app
//! ```
//!
//! ```json
//! {"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"list-directory","arguments":{"directoryPath":"."}}}
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod extractor;
pub mod graph;
pub mod server;
pub mod tools;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
