//! The loop's clock.
//!
//! Timer deadlines are absolute timestamps expressed as fractional seconds on
//! a monotonic clock. All timestamps share one process-wide origin, so values
//! from different [`Reactor`](crate::Reactor) instances are comparable.

use std::sync::OnceLock;
use std::time::Instant;

static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Returns the current monotonic time in seconds, with sub-second precision.
///
/// The origin is fixed the first time the clock is read; only differences
/// between timestamps are meaningful.
///
/// # Examples
///
/// ```rust
/// let start = airloop::now();
/// let later = airloop::now();
/// assert!(later >= start);
/// ```
pub fn now() -> f64 {
    ORIGIN.get_or_init(Instant::now).elapsed().as_secs_f64()
}
