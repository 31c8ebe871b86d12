//! Core types shared across codebase-mcp.
//!
//! Currently this is the error taxonomy; see [`error`] for details.

pub mod error;

pub use error::{CodebaseError, ErrorContext, user_friendly_error};
