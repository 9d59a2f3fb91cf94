//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--api-base <url>`: Override the API endpoint (GitHub Enterprise)
//! - `--debug`: Enable debug logging

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Treetop - atomic multi-file commits against GitHub-hosted repositories
#[derive(Parser, Debug)]
#[command(name = "treetop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API base URL (defaults to https://api.github.com)
    #[arg(long, global = true, env = "TREETOP_API_BASE", value_name = "URL")]
    pub api_base: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the authenticated account (connection test)
    Whoami,

    /// List repositories of the authenticated user or a given owner
    Repos {
        /// List this owner's repositories instead of your own
        #[arg(long)]
        owner: Option<String>,
    },

    /// List branches with their head commits
    Branches {
        /// Repository as owner/name
        repo: String,
    },

    /// List a directory
    Ls {
        /// Repository as owner/name
        repo: String,

        /// Directory path (repository root when omitted)
        #[arg(default_value = "")]
        path: String,

        /// Branch (the repository's default branch when omitted)
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Print a file's raw contents to stdout
    Cat {
        /// Repository as owner/name
        repo: String,

        /// File path
        path: String,

        /// Branch (the repository's default branch when omitted)
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Create or update one file
    Put {
        /// Repository as owner/name
        repo: String,

        /// Destination path in the repository
        path: String,

        /// Local file to upload
        #[arg(short, long, value_name = "LOCAL")]
        file: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Branch (the repository's default branch when omitted)
        #[arg(short, long)]
        branch: Option<String>,

        /// Content fingerprint from an earlier read; stale values fail the
        /// write instead of overwriting
        #[arg(long, value_name = "SHA")]
        sha: Option<String>,
    },

    /// Delete one file
    Rm {
        /// Repository as owner/name
        repo: String,

        /// File path
        path: String,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Branch (the repository's default branch when omitted)
        #[arg(short, long)]
        branch: Option<String>,

        /// Content fingerprint from an earlier read
        #[arg(long, value_name = "SHA")]
        sha: Option<String>,
    },

    /// Commit several files atomically as one commit
    Commit {
        /// Repository as owner/name
        repo: String,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Branch (the repository's default branch when omitted)
        #[arg(short, long)]
        branch: Option<String>,

        /// File to include, as REPO_PATH=LOCAL_PATH; repeatable
        #[arg(short = 'f', long = "file", value_name = "PATH=LOCAL", required = true)]
        files: Vec<String>,
    },

    /// Create a branch from another branch's head
    Branch {
        /// Repository as owner/name
        repo: String,

        /// New branch name
        name: String,

        /// Source branch (the repository's default branch when omitted)
        #[arg(long)]
        from: Option<String>,
    },

    /// Open a pull request
    Pr {
        /// Repository as owner/name
        repo: String,

        /// PR title
        #[arg(long)]
        title: String,

        /// PR body
        #[arg(long)]
        body: Option<String>,

        /// Branch with the changes
        #[arg(long)]
        head: String,

        /// Branch to merge into (the repository's default branch when omitted)
        #[arg(long)]
        base: Option<String>,
    },
}
