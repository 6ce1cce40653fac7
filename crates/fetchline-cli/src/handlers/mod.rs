//! Command handlers.
//!
//! Handlers take the [`CliContext`](crate::CliContext), validate CLI-specific
//! input, call into the composed services and format terminal output.

pub mod download;
pub mod get;
