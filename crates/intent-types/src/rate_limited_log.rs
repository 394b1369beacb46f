//! TTL-bounded suppression of repeated log messages, so a sustained error
//! condition (e.g. quota exhaustion) produces one log line per interval
//! instead of one per call.
//!
//! Lives here rather than in a higher-level crate because both the
//! Gateway client and the identity manager need to rate-limit their own
//! warnings and neither should depend on the other.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
const COMPACTION_AGE: Duration = Duration::from_secs(3600);
const CAPACITY: usize = 100;

pub struct RateLimitedLogger {
    interval: Duration,
    last_emitted: Mutex<HashMap<String, Instant>>,
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl RateLimitedLogger {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emitted: Mutex::new(HashMap::with_capacity(CAPACITY)),
        }
    }

    /// Returns `true` if the caller should emit the log line for `level`
    /// and `message` now, `false` if it is currently suppressed.
    pub fn should_emit(&self, level: &str, message: &str) -> bool {
        let key = format!("{level}:{message}");
        let now = Instant::now();
        let mut map = self.last_emitted.lock().unwrap_or_else(|p| p.into_inner());

        map.retain(|_, last| now.duration_since(*last) < COMPACTION_AGE);

        match map.get(&key) {
            Some(last) if now.duration_since(*last) < self.interval => false,
            _ => {
                map.insert(key, now);
                true
            }
        }
    }

    pub fn warn_rate_limited(&self, message: &str) {
        if self.should_emit("WARNING", message) {
            tracing::warn!("{message}");
        }
    }
}

/// The process-wide limiter shared by every crate that needs rate-limited
/// warnings, so a quota warning logged from the Gateway client and one
/// logged from the identity manager share the same suppression window.
pub static SHARED: Lazy<RateLimitedLogger> = Lazy::new(RateLimitedLogger::default);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_emission_passes_through() {
        let logger = RateLimitedLogger::default();
        assert!(logger.should_emit("WARNING", "quota exceeded"));
    }

    #[test]
    fn repeated_emission_within_interval_is_suppressed() {
        let logger = RateLimitedLogger::default();
        assert!(logger.should_emit("WARNING", "quota exceeded"));
        assert!(!logger.should_emit("WARNING", "quota exceeded"));
    }

    #[test]
    fn distinct_messages_are_independent() {
        let logger = RateLimitedLogger::default();
        assert!(logger.should_emit("WARNING", "a"));
        assert!(logger.should_emit("WARNING", "b"));
    }

    #[test]
    fn emission_after_interval_elapses_passes_through_again() {
        let logger = RateLimitedLogger::new(Duration::from_millis(10));
        assert!(logger.should_emit("WARNING", "quota exceeded"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(logger.should_emit("WARNING", "quota exceeded"));
    }
}
