//! Token-bucket rate limiter guarding the upstream search path.

use std::time::Instant;

use parking_lot::Mutex;

/// Non-blocking token bucket.
///
/// Permits accrue continuously at `permits_per_second` up to `burst`.
/// Acquisition never queues: a caller either gets a permit now or is told
/// to come back later.
pub struct RateLimiter {
    permits_per_second: f64,
    burst: f64,
    state: Mutex<Bucket>,
}

struct Bucket {
    available: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter that starts with a full bucket.
    pub fn new(permits_per_second: f64, burst: f64) -> Self {
        Self {
            permits_per_second,
            burst,
            state: Mutex::new(Bucket {
                available: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one permit if available. Never blocks.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.state.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.available = (bucket.available + elapsed * self.permits_per_second).min(self.burst);
        bucket.last_refill = now;

        if bucket.available >= 1.0 {
            bucket.available -= 1.0;
            true
        } else {
            false
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("permits_per_second", &self.permits_per_second)
            .field("burst", &self.burst)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_burst_then_fail_fast() {
        let limiter = RateLimiter::new(1.0, 3.0);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_refill_restores_permits() {
        let limiter = RateLimiter::new(1000.0, 1.0);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        std::thread::sleep(Duration::from_millis(10));
        assert!(limiter.try_acquire());
    }

    #[test]
    fn test_refill_capped_at_burst() {
        let limiter = RateLimiter::new(1000.0, 2.0);
        std::thread::sleep(Duration::from_millis(20));

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }
}
