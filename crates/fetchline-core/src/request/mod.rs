//! Request lifecycle tracking and tag-based cancellation.
//!
//! # Structure
//!
//! - `handle` - [`RequestHandle`], one cancellable in-flight operation
//! - `registry` - [`RequestRegistry`], the tag → handle map
//! - `observer` - [`ObserverAdapter`], binds one request's events to the registry
//! - `errors` - [`RequestError`] returned to callers of observed requests

pub mod errors;
pub mod handle;
pub mod observer;
pub mod registry;

pub use errors::RequestError;
pub use handle::RequestHandle;
pub use observer::{IndicatorConfig, ObserverAdapter, ObserverState};
pub use registry::RequestRegistry;
