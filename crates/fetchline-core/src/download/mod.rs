//! Download domain types and errors.
//!
//! No I/O, networking, or runtime dependencies allowed here; the transfer
//! itself lives in `fetchline-download`.
//!
//! # Structure
//!
//! - `session` - [`DownloadSession`], [`SessionId`], [`SessionState`]
//! - `errors` - Error types for download operations

pub mod errors;
pub mod session;

pub use errors::{DownloadError, DownloadResult};
pub use session::{DEFAULT_SESSION_KIND, DownloadSession, SessionId, SessionState};
