use std::time::Duration;
use std::thread;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use log::debug;
use serde::{Deserialize, Serialize};

/// Retry settings for transient provider conditions, read from the `retry` config section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Base wait between attempts in milliseconds. 0 disables waiting.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Double the wait after every attempt, capped at 60s
    #[serde(default)]
    pub exponential: bool,
}

fn default_max_attempts() -> usize {
    5
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            exponential: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries `max_attempts` times without waiting
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            interval_ms: 0,
            exponential: false,
        }
    }

    /// Create a fresh handler for one retry loop
    pub fn handler(&self) -> RetryHandler {
        let base = Duration::from_millis(self.interval_ms);
        if self.exponential {
            RetryHandler::with_backoff(base, self.max_attempts)
        } else {
            RetryHandler::with_intervals(vec![base; self.max_attempts.max(1)], self.max_attempts)
        }
    }
}

/// Retry mechanism with bounded attempts and optional exponential backoff
pub struct RetryHandler {
    /// Current attempt number (0-based)
    attempt: usize,
    /// Maximum number of attempts before giving up
    max_attempts: usize,
    /// Fixed intervals (if None, uses exponential backoff from `base`)
    intervals: Option<Vec<Duration>>,
    /// Base delay for exponential backoff
    base: Duration,
}

impl RetryHandler {
    /// Create a retry handler with exponential backoff: base, 2*base, 4*base, ... (60s max)
    pub fn with_backoff(base: Duration, max_attempts: usize) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            intervals: None,
            base,
        }
    }

    /// Create a retry handler with custom intervals
    pub fn with_intervals(intervals: Vec<Duration>, max_attempts: usize) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            intervals: Some(intervals),
            base: Duration::ZERO,
        }
    }

    /// Get the current attempt number (0-based)
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// Check if we should continue retrying
    pub fn should_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Get the delay for the current attempt
    pub fn get_delay(&self) -> Duration {
        match self.intervals {
            // Clamp to the last interval if we exceed the list
            Some(ref intervals) if !intervals.is_empty() => {
                let index = std::cmp::min(self.attempt, intervals.len() - 1);
                intervals[index]
            }
            Some(_) => Duration::ZERO,
            None => {
                let factor = 2_u32.saturating_pow(self.attempt as u32);
                std::cmp::min(self.base.saturating_mul(factor), Duration::from_secs(60))
            }
        }
    }

    /// Wait for the current retry interval
    /// Returns true if we should continue, false if interrupted by the running flag
    pub fn wait(&mut self, running: Option<&Arc<AtomicBool>>) -> bool {
        let delay = self.get_delay();
        debug!("Retry attempt {}: waiting {:?} before next attempt", self.attempt + 1, delay);

        // If we have a running flag, check it periodically during the wait
        if let Some(running_flag) = running {
            let check_interval = Duration::from_millis(100);
            let mut remaining = delay;

            loop {
                if !running_flag.load(Ordering::SeqCst) {
                    debug!("Retry interrupted by shutdown signal");
                    return false;
                }
                if remaining.is_zero() {
                    break;
                }

                let sleep_time = std::cmp::min(check_interval, remaining);
                thread::sleep(sleep_time);
                remaining = remaining.saturating_sub(sleep_time);
            }
        } else if !delay.is_zero() {
            thread::sleep(delay);
        }

        self.attempt += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_intervals() {
        let mut retry = RetryHandler::with_backoff(Duration::from_secs(1), 10);

        assert_eq!(retry.get_delay(), Duration::from_secs(1));
        retry.attempt += 1;
        assert_eq!(retry.get_delay(), Duration::from_secs(2));
        retry.attempt += 1;
        assert_eq!(retry.get_delay(), Duration::from_secs(4));
        retry.attempt = 9;
        assert_eq!(retry.get_delay(), Duration::from_secs(60));
    }

    #[test]
    fn test_fixed_intervals_clamp() {
        let mut retry = RetryHandler::with_intervals(vec![Duration::from_millis(5), Duration::from_millis(7)], 4);
        assert_eq!(retry.get_delay(), Duration::from_millis(5));
        retry.attempt = 3;
        assert_eq!(retry.get_delay(), Duration::from_millis(7));
    }

    #[test]
    fn test_max_attempts() {
        let mut retry = RetryPolicy::immediate(3).handler();

        assert!(retry.should_retry());
        retry.attempt = 2;
        assert!(retry.should_retry());
        retry.attempt = 3;
        assert!(!retry.should_retry());
    }

    #[test]
    fn test_zero_attempts_never_retries() {
        let retry = RetryPolicy::immediate(0).handler();
        assert!(!retry.should_retry());
    }

    #[test]
    fn test_wait_counts_attempts() {
        let mut retry = RetryPolicy::immediate(2).handler();
        assert!(retry.wait(None));
        assert!(retry.wait(None));
        assert_eq!(retry.attempt(), 2);
        assert!(!retry.should_retry());
    }

    #[test]
    fn test_wait_interrupted() {
        let running = Arc::new(AtomicBool::new(false));
        let mut retry = RetryPolicy::immediate(2).handler();
        assert!(!retry.wait(Some(&running)));
        assert_eq!(retry.attempt(), 0);
    }

    #[test]
    fn test_policy_deserialize_defaults() {
        let policy: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, RetryPolicy::default());

        let policy: RetryPolicy = serde_json::from_str("{\"max_attempts\": 2, \"exponential\": true}").unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert!(policy.exponential);
    }
}
