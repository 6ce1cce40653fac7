//! Available commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a tagged request and print the JSON response
    Get(GetArgs),

    /// Manage resumable downloads
    Download {
        #[command(subcommand)]
        command: DownloadCommand,
    },
}

/// Arguments for `fetchline get`.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Absolute URL, or a path joined to --base-url
    pub url: String,

    /// Registry tag for the request
    #[arg(long, default_value = "get")]
    pub tag: String,

    /// Extra header, as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Query parameter, as "name=value" (repeatable)
    #[arg(short = 'q', long = "query")]
    pub query: Vec<String>,

    /// Send a POST with this JSON body instead of a GET
    #[arg(long)]
    pub json: Option<String>,

    /// Do not show a spinner while the request is in flight
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum DownloadCommand {
    /// Register a download without starting it
    Add {
        /// Remote URL of the file
        url: String,
        /// Destination file (defaults to the download directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Grouping kind used by `list`
        #[arg(long, default_value = fetchline_core::DEFAULT_SESSION_KIND)]
        kind: String,
    },

    /// Start or resume a download and wait for it (Ctrl-C pauses)
    Start {
        /// Session id, or the remote URL
        target: String,
        /// Destination file when `target` is a URL not yet registered
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pause automatically after this many seconds
        #[arg(long)]
        pause_after: Option<u64>,
        /// Discard partial data and start from byte zero
        #[arg(long)]
        restart: bool,
    },

    /// Delete a download record, and its file unless --keep-file
    Remove {
        /// Session id
        id: String,
        #[arg(long)]
        keep_file: bool,
    },

    /// List downloads of a kind, oldest first
    List {
        #[arg(long, default_value = fetchline_core::DEFAULT_SESSION_KIND)]
        kind: String,
    },

    /// Print the number of recorded downloads
    Count,

    /// Show one download record
    Show {
        /// Session id
        id: String,
    },

    /// Mark downloads left running by a crashed process as paused
    Recover,
}
