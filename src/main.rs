//! codebase-mcp entry point
//!
//! Parses the command line, serves tools over stdio, and prints a
//! user-friendly error with suggestions if startup or the transport fails.

use anyhow::Result;
use clap::Parser;
use codebase_mcp::cli;
use codebase_mcp::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
