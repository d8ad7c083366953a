//! Wall-clock abstraction for message timestamps.
//!
//! Chat messages carry a human-readable time of day stamped at dispatch.
//! Routing that single system dependency through a trait keeps the driver
//! deterministic under test: production uses the real clock, tests pin one.

use chrono::{DateTime, Local};

/// Source of wall-clock time.
///
/// Implementations must be cheap to clone; the driver holds one by value.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;
}
