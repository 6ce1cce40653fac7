//! Progress throttling for transfer callbacks.

mod throttle;

pub use throttle::ProgressThrottle;
