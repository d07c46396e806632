//! Per-client rate limiting
//!
//! Fixed-window token bucket, one bucket per client identity. Buckets are
//! created lazily on first sight of an identity and evicted after a full
//! window of inactivity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Every this many `consume` calls, stale buckets are swept out. Keeps
/// one-off identities from accumulating in the map between restarts.
const EVICTION_PERIOD: u64 = 256;

/// Tracks rate limit state for a single client identity
#[derive(Debug)]
struct Bucket {
    remaining: u32,
    window_start: Instant,
}

impl Bucket {
    fn new(max_points: u32) -> Self {
        Self {
            remaining: max_points,
            window_start: Instant::now(),
        }
    }
}

/// Rate limiter shared across all in-flight requests.
///
/// Consumption is atomic per identity: the bucket map is guarded by a single
/// mutex, so two concurrent `consume` calls can never both take the last
/// point.
pub struct RateLimiter {
    max_points: u32,
    window: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
    consume_count: AtomicU64,
}

impl RateLimiter {
    pub fn new(max_points: u32, window: Duration) -> Self {
        Self {
            max_points,
            window,
            buckets: Mutex::new(HashMap::new()),
            consume_count: AtomicU64::new(0),
        }
    }

    /// Consume one point for `identity`.
    ///
    /// Returns `Err(retry_after_secs)` when the bucket is empty, where
    /// `retry_after_secs` is the time until the window resets, rounded up to
    /// whole seconds, minimum 1.
    pub fn consume(&self, identity: &str) -> Result<(), u64> {
        let mut buckets = self.buckets.lock().unwrap();

        let count = self.consume_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % EVICTION_PERIOD == 0 {
            Self::evict_from(&mut buckets, self.window);
        }

        let bucket = buckets
            .entry(identity.to_string())
            .or_insert_with(|| Bucket::new(self.max_points));

        let elapsed = bucket.window_start.elapsed();
        if elapsed >= self.window {
            bucket.remaining = self.max_points;
            bucket.window_start = Instant::now();
        }

        if bucket.remaining == 0 {
            let left = self.window.saturating_sub(bucket.window_start.elapsed());
            let mut secs = left.as_secs();
            if left.subsec_nanos() > 0 {
                secs += 1;
            }
            return Err(secs.max(1));
        }

        bucket.remaining -= 1;
        Ok(())
    }

    /// Current points left for `identity` without consuming any.
    pub fn remaining(&self, identity: &str) -> u32 {
        let buckets = self.buckets.lock().unwrap();
        match buckets.get(identity) {
            Some(bucket) if bucket.window_start.elapsed() < self.window => bucket.remaining,
            _ => self.max_points,
        }
    }

    /// Administrative override: forget everything known about `identity`.
    pub fn reset(&self, identity: &str) {
        self.buckets.lock().unwrap().remove(identity);
    }

    /// Drop buckets that have been idle past a full window. `consume` does
    /// this on its own every `EVICTION_PERIOD` calls.
    pub fn evict_stale(&self) {
        let mut buckets = self.buckets.lock().unwrap();
        Self::evict_from(&mut buckets, self.window);
    }

    fn evict_from(buckets: &mut HashMap<String, Bucket>, window: Duration) {
        buckets.retain(|_, bucket| bucket.window_start.elapsed() < window);
    }
}
