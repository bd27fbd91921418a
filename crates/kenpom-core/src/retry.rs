//! Retry policy with exponential backoff and jitter.

use std::time::Duration;

use crate::error::ErrorClass;

/// Largest jitter, as a fraction of the undelayed backoff.
const MAX_JITTER_FRACTION: f64 = 0.1;

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between attempts.
    Fixed {
        /// Delay between attempts.
        delay: Duration,
    },
    /// Waits `base * 2^(attempt-1)`, plus up to 10% jitter, capped at `max`.
    Exponential {
        /// Delay after the first failed attempt.
        base: Duration,
        /// Upper bound on any single delay.
        max: Duration,
        /// Whether to add random jitter.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(600),
            max: Duration::from_secs(15),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// Jitter is added before the cap, so successive delays never decrease.
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential { base, max, jitter } => {
                let exponent = attempt.saturating_sub(1).min(30);
                let mut seconds = base.as_secs_f64() * f64::from(1_u32 << exponent);

                if jitter {
                    seconds += seconds * MAX_JITTER_FRACTION * fastrand::f64();
                }

                Duration::from_secs_f64(seconds.min(max.as_secs_f64()))
            }
        }
    }
}

/// Attempt budget and backoff for one logical request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay schedule applied between attempts.
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                base,
                max,
                jitter: true,
            },
        }
    }

    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
        }
    }

    /// Single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Per-call retry bookkeeping. Lives for one `execute` call only.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    pub attempt: u32,
    pub last_class: Option<ErrorClass>,
    pub next_backoff: Option<Duration>,
    pub delays: Vec<Duration>,
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            attempt: 0,
            last_class: None,
            next_backoff: None,
            delays: Vec::new(),
        }
    }

    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.next_backoff = None;
        self.attempt
    }

    /// Records a failed attempt and returns the delay before the next one, if any is allowed.
    pub fn record_failure(&mut self, class: ErrorClass, config: &RetryConfig) -> Option<Duration> {
        self.last_class = Some(class);

        if !class.retryable() || self.attempt >= config.max_attempts.max(1) {
            return None;
        }

        let delay = config.delay_for_attempt(self.attempt);
        self.next_backoff = Some(delay);
        self.delays.push(delay);
        Some(delay)
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}
