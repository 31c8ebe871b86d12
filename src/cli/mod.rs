//! Command-line interface for codebase-mcp.
//!
//! The binary takes a single positional argument, the project root, and then
//! speaks the protocol on stdin/stdout until the client disconnects.
//!
//! # Global Options
//!
//! - `--config <FILE>` / `-c` - TOML configuration (also `CODEBASE_MCP_CONFIG`)
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only
//!
//! Logs always go to stderr; `RUST_LOG` takes precedence over the flags.
//!
//! # Examples
//!
//! ```bash
//! codebase-mcp ~/projects/web-app
//! codebase-mcp --verbose --config ~/.config/codebase-mcp.toml .
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::constants::CONFIG_PATH_ENV;
use crate::server::{Server, run_stdio};
use crate::tools::{ToolContext, ToolRegistry};
use crate::utils::PathSandbox;

/// Runtime settings derived from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
    /// Configuration file path, before `~` expansion.
    pub config_path: Option<String>,
}

impl CliConfig {
    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = std::env::var("RUST_LOG")
            .ok()
            .and_then(|value| EnvFilter::try_new(value).ok())
            .unwrap_or_else(|| EnvFilter::new(&self.log_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false)
            .try_init();
    }
}

/// Filesystem inspection tools for a project directory, served over stdio.
#[derive(Parser, Debug)]
#[command(
    name = "codebase-mcp",
    about = "Expose read-only codebase inspection tools over the Model Context Protocol",
    version,
    long_about = "Serves directory listings, file reads with metadata, config file search, \
                  dependency graphs and project summaries for a single root directory over \
                  newline-delimited JSON-RPC on stdin/stdout."
)]
pub struct Cli {
    /// Project root. No path outside it is ever read.
    #[arg(value_name = "ROOT")]
    root: String,

    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE", env = CONFIG_PATH_ENV)]
    config: Option<String>,

    /// Enable debug logging.
    ///
    /// Mutually exclusive with `--quiet`.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Translate flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            config_path: self.config.clone(),
        }
    }

    /// The root directory as given.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Set up logging, load configuration, and serve until stdin closes.
    ///
    /// # Errors
    ///
    /// Invalid root, unreadable configuration, or transport failures.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Like [`execute`](Self::execute) but without touching global logging.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let settings = ServerConfig::load_optional(config.config_path.as_deref()).await?;
        debug!("Effective configuration: {:?}", settings);

        let sandbox = PathSandbox::new(&self.root)?;
        info!("Root directory: {}", sandbox.root().display());

        let context = ToolContext::new(sandbox, settings.cache.options());
        let cleanup = context
            .dependency_cache
            .spawn_cleanup(settings.cache.cleanup_interval(), settings.cache.cleanup_max_age());

        run_stdio(Server::new(ToolRegistry::new(context)), cleanup).await
    }
}
