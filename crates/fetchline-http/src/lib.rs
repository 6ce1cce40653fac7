//! HTTP adapter for fetchline.
//!
//! - [`ReqwestTransport`] implements
//!   [`HttpTransportPort`](fetchline_core::HttpTransportPort) on top of reqwest
//! - [`HttpClient`] runs tagged JSON requests through an
//!   [`ObserverAdapter`](fetchline_core::ObserverAdapter), so they can be
//!   cancelled through the shared [`RequestRegistry`](fetchline_core::RequestRegistry)

mod client;
mod config;
mod error;
mod transport;

// ============================================================================
// Public API
// ============================================================================

pub use client::HttpClient;
pub use config::HttpConfig;
pub use error::{HttpError, HttpResult};
pub use transport::ReqwestTransport;
