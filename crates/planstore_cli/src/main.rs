//! planstore CLI
//!
//! Command-line tools for working with a file-backed plan store.
//!
//! # Commands
//!
//! - `create`, `get`, `replace`, `patch`, `delete` - Plan lifecycle against a store directory
//! - `etag` - Print the ETag a document would be stored under
//! - `issue-token` - Mint a bearer token for a server secret

mod commands;

use clap::{Parser, Subcommand};
use commands::plan::StoreTarget;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// planstore command-line tools.
#[derive(Parser)]
#[command(name = "planstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Bound on each store operation, in milliseconds
    #[arg(global = true, long, default_value = "5000")]
    timeout_ms: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new plan read from a JSON file
    Create {
        /// JSON document to store
        file: PathBuf,
    },

    /// Print a stored plan
    Get {
        /// Object id
        id: String,

        /// Only print when the stored ETag differs
        #[arg(long)]
        if_none_match: Option<String>,
    },

    /// Replace a stored plan with a JSON file
    Replace {
        /// Object id
        id: String,

        /// JSON document to store
        file: PathBuf,

        /// Only replace when the stored ETag matches
        #[arg(long)]
        if_match: Option<String>,
    },

    /// Deep-merge a JSON file into a stored plan
    Patch {
        /// Object id
        id: String,

        /// JSON object to merge
        file: PathBuf,

        /// Only patch when the stored ETag matches
        #[arg(long)]
        if_match: Option<String>,
    },

    /// Delete a stored plan
    Delete {
        /// Object id
        id: String,
    },

    /// Print the ETag of a JSON file without storing it
    Etag {
        /// JSON document
        file: PathBuf,
    },

    /// Issue an HMAC bearer token
    IssueToken {
        /// Token subject
        #[arg(short, long)]
        subject: String,

        /// Signing secret (defaults to PLANSTORE_AUTH_SECRET)
        #[arg(long, env = "PLANSTORE_AUTH_SECRET", hide_env_values = true)]
        secret: String,

        /// Lifetime in seconds
        #[arg(long, default_value = "3600")]
        expiry_secs: u64,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let target = |what: &str| -> Result<StoreTarget, String> {
        let path = cli
            .path
            .clone()
            .ok_or_else(|| format!("Store path required for {what}"))?;
        Ok(StoreTarget::new(path).with_timeout(Duration::from_millis(cli.timeout_ms)))
    };

    match cli.command {
        Commands::Create { file } => {
            commands::plan::create(&target("create")?, &file)?;
        }
        Commands::Get { id, if_none_match } => {
            commands::plan::get(&target("get")?, &id, if_none_match)?;
        }
        Commands::Replace { id, file, if_match } => {
            commands::plan::replace(&target("replace")?, &id, &file, if_match)?;
        }
        Commands::Patch { id, file, if_match } => {
            commands::plan::patch(&target("patch")?, &id, &file, if_match)?;
        }
        Commands::Delete { id } => {
            commands::plan::delete(&target("delete")?, &id)?;
        }
        Commands::Etag { file } => {
            commands::etag::run(&file)?;
        }
        Commands::IssueToken {
            subject,
            secret,
            expiry_secs,
        } => {
            commands::token::run(&subject, secret, expiry_secs)?;
        }
        Commands::Version => {
            println!("planstore CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("planstore core v{}", planstore_core::VERSION);
        }
    }

    Ok(())
}
