//! Reusable per-topic rate limiter, replacing the duplicated
//! last-notified-timestamp fields a naive port would carry one copy of per
//! alert kind.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    period: Duration,
    last_fired: HashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        RateLimiter {
            period,
            last_fired: HashMap::new(),
        }
    }

    pub fn hourly() -> Self {
        RateLimiter::new(Duration::from_secs(3600))
    }

    /// Returns true (and records the firing) if `topic` has not fired within
    /// the configured period.
    pub fn try_fire(&mut self, topic: &str) -> bool {
        let now = Instant::now();
        match self.last_fired.get(topic) {
            Some(last) if now.duration_since(*last) < self.period => false,
            _ => {
                self.last_fired.insert(topic.to_string(), now);
                true
            }
        }
    }
}
