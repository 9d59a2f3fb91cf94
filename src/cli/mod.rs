//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialize logging (stderr; stdout is reserved for results)
//! - Build the configured store and delegate to command handlers
//!
//! The CLI layer is thin. All protocol logic lives in [`crate::ops`]; the
//! handlers only translate arguments and print envelopes.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::store::github::GitHubStore;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let config = Config::from_env(cli.api_base.as_deref())?;
    let store = GitHubStore::new(config);
    Ok(commands::dispatch(cli.command, &store).await)
}

/// Initialize the tracing subscriber.
///
/// `--debug` forces debug-level output for this crate; otherwise `RUST_LOG`
/// applies, defaulting to info.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("treetop=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("treetop=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
