//! `fetchline` command-line adapter.
//!
//! `bootstrap` is the composition root; `handlers` hold one module per
//! command group and only talk to the [`CliContext`].
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, DownloadCommand};
pub use error::CliError;
pub use parser::Cli;
