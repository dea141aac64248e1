use std::time::{Duration, Instant};

use dashmap::DashMap;

const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);
const LOGIN_MAX_FAILURES: u32 = 5;

/// Per-email login brute force limiter.
pub struct LoginRateLimiter {
    /// email -> (failed_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
    window: Duration,
    max_failures: u32,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::with_limits(LOGIN_WINDOW, LOGIN_MAX_FAILURES)
    }

    pub fn with_limits(window: Duration, max_failures: u32) -> Self {
        Self {
            entries: DashMap::new(),
            window,
            max_failures,
        }
    }

    /// Check if login attempt is allowed. Returns retry-after seconds when not.
    /// Does not increment the counter; call `record_failure()` on a bad password.
    pub fn check(&self, email: &str) -> Result<(), u64> {
        let now = Instant::now();

        let Some(entry) = self.entries.get(&email.to_lowercase()) else {
            return Ok(());
        };

        let (count, start) = entry.value();

        if now.duration_since(*start) > self.window {
            return Ok(());
        }

        if *count >= self.max_failures {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(self.window.as_secs().saturating_sub(elapsed));
        }

        Ok(())
    }

    /// Record a failed login attempt. Increments the counter for the given email.
    pub fn record_failure(&self, email: &str) {
        let now = Instant::now();

        let mut entry = self.entries.entry(email.to_lowercase()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > self.window {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    pub fn reset(&self, email: &str) {
        self.entries.remove(&email.to_lowercase());
    }
}
