use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Milliseconds on the monotonic clock [`crate::Timeout::ready_time_ms`]
/// deadlines are expressed against.
///
/// Backed by [`Instant`] rather than a wall clock so deadlines are immune
/// to clock adjustments; the epoch is the first call to this function in
/// the process, so returned values are only meaningful relative to each
/// other, never across processes.
pub fn monotonic_ms() -> i64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    Instant::now().saturating_duration_since(epoch).as_millis() as i64
}
