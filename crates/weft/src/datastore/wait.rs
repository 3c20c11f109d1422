//! Shared timeout-bounded condition-variable loop backing `wait`/`wait_for`
//! (spec §4.8). Generic over the store's inner state so it has no
//! knowledge of `Entry`/`IndexMap` shapes.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{StoreError, StoreResult};
use crate::value::Value;

/// How often an untimed wait re-checks its condition even without a
/// broadcast. Lazy TTL eviction has no dedicated sweeper thread, so a key
/// that simply expires under nobody's write never triggers `notify_all`;
/// this polling floor is what lets a `wait()` with no user timeout still
/// notice that expiry.
pub(super) const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Blocks on `condvar` until `check` (run under the held lock) returns
/// `Some`, or `timeout` seconds elapse. `check` runs once immediately
/// before any waiting, so an already-satisfied condition never blocks.
pub(super) fn wait_with_timeout<T>(
    mutex: &Mutex<T>,
    condvar: &Condvar,
    timeout: Option<f64>,
    key: &str,
    mut check: impl FnMut(&mut MutexGuard<'_, T>) -> Option<Value>,
) -> StoreResult<Value> {
    let deadline = timeout.map(|secs| Instant::now() + Duration::from_secs_f64(secs.max(0.0)));
    let mut guard = mutex.lock().unwrap();
    loop {
        if let Some(value) = check(&mut guard) {
            return Ok(value);
        }
        let poll_duration = match deadline {
            None => POLL_INTERVAL,
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(StoreError::Timeout { key: key.to_string(), timeout_secs: timeout.unwrap_or(0.0) });
                }
                remaining.min(POLL_INTERVAL)
            }
        };
        let (next_guard, result) = condvar.wait_timeout(guard, poll_duration).unwrap();
        guard = next_guard;
        if result.timed_out() && deadline.is_some_and(|d| Instant::now() >= d) {
            return match check(&mut guard) {
                Some(value) => Ok(value),
                None => Err(StoreError::Timeout { key: key.to_string(), timeout_secs: timeout.unwrap_or(0.0) }),
            };
        }
    }
}
