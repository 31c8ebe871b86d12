//! Error handling for codebase-mcp
//!
//! This module provides the error types shared by the sandbox, the result cache,
//! the dependency extractor and the tool layer, plus user-friendly reporting for
//! the command line.
//!
//! # Architecture
//!
//! - [`CodebaseError`] - Enumerated error types for every failure the core can report
//! - [`ErrorContext`] - Wrapper that adds user-facing details and suggestions
//!
//! # Propagation Policy
//!
//! - Sandboxing and fingerprinting surface errors to their immediate caller without retry
//! - A content read failure for a single dependency node becomes a sentinel string
//!   instead of an error (see [`crate::graph`])
//! - A fingerprint failure during a cache `set` is logged and swallowed
//!
//! Application glue (CLI, config loading, the protocol loop) uses [`anyhow`] with
//! context; the typed errors are recovered with `downcast_ref` where needed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use codebase_mcp::core::{CodebaseError, user_friendly_error};
//!
//! let error = CodebaseError::ParentMissing {
//!     parent: "/project/missing".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// The main error type for codebase-mcp operations.
///
/// # Error Categories
///
/// ## Sandboxing
/// - [`AccessDenied`] - Path (or its symlink target, or its parent) escapes the root
/// - [`ParentMissing`] - Target does not exist and neither does its parent
///
/// ## Filesystem
/// - [`Io`] - stat/read/list failure unrelated to sandboxing
///
/// ## Collaborators
/// - [`ExtractorFailure`] - The dependency extractor could not build a tree
///
/// ## Requests and configuration
/// - [`InvalidArguments`], [`UnknownTool`], [`ConfigError`], [`InvalidRoot`]
///
/// [`AccessDenied`]: CodebaseError::AccessDenied
/// [`ParentMissing`]: CodebaseError::ParentMissing
/// [`Io`]: CodebaseError::Io
/// [`ExtractorFailure`]: CodebaseError::ExtractorFailure
/// [`InvalidArguments`]: CodebaseError::InvalidArguments
/// [`UnknownTool`]: CodebaseError::UnknownTool
/// [`ConfigError`]: CodebaseError::ConfigError
/// [`InvalidRoot`]: CodebaseError::InvalidRoot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodebaseError {
    /// A requested path resolves outside the root directory.
    ///
    /// Raised when the lexical path escapes the root, when a symlink points
    /// outside the root, or when the parent of a not-yet-existing target does.
    ///
    /// # Fields
    /// - `path`: The offending path as it was resolved
    /// - `reason`: Which check rejected it
    #[error("Access denied - {reason}: {path}")]
    AccessDenied {
        /// The offending path
        path: String,
        /// Which containment check failed
        reason: String,
    },

    /// The target does not exist and its parent directory cannot be resolved.
    #[error("Parent directory does not exist: {parent}")]
    ParentMissing {
        /// The parent directory that could not be resolved
        parent: String,
    },

    /// A filesystem operation failed.
    ///
    /// The underlying [`std::io::Error`] is flattened into a message so the
    /// error stays cloneable and comparable.
    #[error("Failed to {operation} '{path}': {message}")]
    Io {
        /// What was being attempted (e.g. "read file", "stat")
        operation: String,
        /// The path involved
        path: String,
        /// The underlying I/O error message
        message: String,
    },

    /// The dependency extractor failed to produce a tree.
    #[error("Dependency extraction failed for '{file}': {reason}")]
    ExtractorFailure {
        /// The start file that was being analysed
        file: String,
        /// Why extraction failed
        reason: String,
    },

    /// Tool arguments did not match the tool's input schema.
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments {
        /// The tool that rejected its arguments
        tool: String,
        /// Deserialization failure message
        reason: String,
    },

    /// A `tools/call` named a tool that is not registered.
    #[error("Unknown tool: {name}")]
    UnknownTool {
        /// The requested tool name
        name: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// The root directory given on the command line is unusable.
    #[error("Invalid root directory '{path}': {reason}")]
    InvalidRoot {
        /// The root as supplied
        path: String,
        /// Why it was rejected
        reason: String,
    },
}

impl CodebaseError {
    /// Build an [`CodebaseError::Io`] from an I/O error and the path involved.
    pub fn io(operation: impl Into<String>, path: &Path, error: &std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }

    /// Build an [`CodebaseError::AccessDenied`] for `path`.
    pub fn access_denied(path: &Path, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from the sandbox rather than the filesystem.
    #[must_use]
    pub const fn is_sandbox_violation(&self) -> bool {
        matches!(self, Self::AccessDenied { .. } | Self::ParentMissing { .. })
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Combines a [`CodebaseError`] with optional details and a suggestion, and
/// renders them with colors on stderr.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: CodebaseError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: CodebaseError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining what went wrong.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// Typed [`CodebaseError`]s are matched first, then bare [`std::io::Error`]s,
/// and anything else is wrapped as a configuration error carrying the full
/// `anyhow` chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(codebase_error) = error.downcast_ref::<CodebaseError>() {
        return create_error_context(codebase_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let ctx = ErrorContext::new(CodebaseError::Io {
            operation: "access".to_string(),
            path: "unknown".to_string(),
            message: io_error.to_string(),
        });
        return match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => ctx
                .with_suggestion("Check file ownership and permissions of the root directory"),
            std::io::ErrorKind::NotFound => {
                ctx.with_suggestion("Check that the file or directory exists and the path is correct")
            }
            _ => ctx,
        };
    }

    ErrorContext::new(CodebaseError::ConfigError {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: CodebaseError) -> ErrorContext {
    match &error {
        CodebaseError::AccessDenied { .. } => ErrorContext::new(error)
            .with_suggestion("Only paths inside the configured root directory can be accessed")
            .with_details("Symlinks are followed before the containment check"),
        CodebaseError::ParentMissing { .. } => ErrorContext::new(error)
            .with_suggestion("Create the parent directory first or check the path for typos"),
        CodebaseError::InvalidRoot { .. } => ErrorContext::new(error)
            .with_suggestion("Pass an existing directory: codebase-mcp <project-root-directory>"),
        CodebaseError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the TOML syntax of the file passed with --config"),
        CodebaseError::ExtractorFailure { .. } => ErrorContext::new(error)
            .with_suggestion("Verify the start file exists and any tsconfig is valid JSON"),
        _ => ErrorContext::new(error),
    }
}
