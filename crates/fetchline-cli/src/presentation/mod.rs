//! Terminal output helpers.

mod progress;
mod tables;

pub use progress::{DownloadEvent, SpinnerFactory, TerminalDownloadCallback};
pub use tables::{format_bytes, format_progress, print_separator, truncate_string};
