//! Production clock using real local time.
//!
//! The core formats message timestamps through the [`Clock`] trait; this is
//! the implementation wired in by the runtime. Tests in the core crate pin a
//! fixed clock instead.

use chrono::{DateTime, Local};
use roomcast_core::Clock;

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[cfg(test)]
mod tests {
    use roomcast_core::Clock;

    use super::*;

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock::new();

        let t1 = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let t2 = clock.now();

        assert!(t2 > t1, "time should advance");
    }
}
