//! Cross-platform utilities for codebase-mcp.
//!
//! - [`fs`] - lexical path normalization and containment
//! - [`path_validation`] - the [`PathSandbox`] every request path goes through
//! - [`platform`] - home directory lookup and `~` expansion

pub mod fs;
pub mod path_validation;
pub mod platform;

pub use fs::normalize_path;
pub use path_validation::{PathSandbox, absolute_path};
pub use platform::{expand_home, get_home_dir};
