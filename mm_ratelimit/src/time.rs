use std::time::Duration;

use tokio::time::Instant;

/// Monotonic clock shared by all identifiers of a limiter
///
/// Reads tokio's clock so paused-time tests (`start_paused`) drive window
/// and refill arithmetic deterministically.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TimeSource;

impl TimeSource {
    #[inline(always)]
    pub fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Convert a window given in fractional seconds into a `Duration`
///
/// Returns `None` for zero, negative, NaN, or overflowing values.
pub(crate) fn secs_to_window(secs: f64) -> Option<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok().filter(|window| !window.is_zero())
}
