use std::sync::LazyLock;
use std::time::Instant;

static ORIGIN: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Milliseconds elapsed on a process-wide monotonic clock.
///
/// Record creation stamps and every expiry computation use this clock, so
/// values are only comparable within one process.
#[inline]
pub fn now_millis() -> u64 {
    ORIGIN.elapsed().as_millis() as u64
}
