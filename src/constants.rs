//! Global constants used throughout the codebase-mcp crate.
//!
//! This module contains cache lifetimes, size thresholds, sentinels, and other
//! values that are used across multiple modules. Defining them centrally
//! makes magic numbers more discoverable.

use std::time::Duration;

/// Maximum age of a cached result before `get` treats it as a miss (10 minutes).
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_millis(600_000);

/// Age after which the background sweep drops an entry (30 minutes).
///
/// This is a memory-reclamation pass only; staleness is already enforced on
/// every `get` by [`DEFAULT_CACHE_MAX_AGE`].
pub const DEFAULT_CLEANUP_MAX_AGE: Duration = Duration::from_millis(1_800_000);

/// How often the background sweep runs (5 minutes).
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_millis(300_000);

/// Longest accepted sweep interval (1 day). Larger values are clamped to it.
pub const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(86_400);

/// Files at or above this size are fingerprinted from metadata only.
pub const FINGERPRINT_CONTENT_THRESHOLD: u64 = 1_000_000;

/// Namespace used when a cache client does not supply one.
pub const DEFAULT_CACHE_NAMESPACE: &str = "default";

/// Content attached to a dependency node whose file could not be read.
pub const FILE_NOT_FOUND_SENTINEL: &str = "File not found";

/// Placeholder returned by config-file search when a pattern has no match.
pub const NOT_FOUND_PLACEHOLDER: &str = "Not found";

/// Maximum directory depth reported by `get-project-basics`.
pub const PROJECT_BASICS_MAX_DEPTH: usize = 2;

/// Extensions probed, in order, when resolving an extensionless import.
pub const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];

/// Symlinks followed when checking a dangling link before giving up.
pub const MAX_SYMLINK_HOPS: usize = 40;

/// Environment variable that points at the configuration file.
pub const CONFIG_PATH_ENV: &str = "CODEBASE_MCP_CONFIG";

/// MCP protocol version reported when the client does not request one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported in the `initialize` response.
pub const SERVER_NAME: &str = "codebase-mcp";
