//! Stream utilities.

pub mod throttle;

pub use throttle::{Throttle, ThrottleExt};
