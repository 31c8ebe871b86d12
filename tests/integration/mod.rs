//! Integration test suite for codebase-mcp
//!
//! End-to-end tests that drive the tools through the public API and the
//! compiled binary over stdio.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **sandbox**: path containment, symlinks, and traversal attempts
//! - **dependency_tree**: graph extraction, flattening, and caching
//! - **tools**: the remaining tools through the registry
//! - **stdio**: the binary speaking JSON-RPC on stdin/stdout

mod dependency_tree;
mod sandbox;
mod stdio;
mod tools;
