//! Retry policies for failed transport attempts.
//!
//! # Design
//! A policy is consulted inline, on the invoking thread, right after each
//! failed transport attempt. It is shared by every concurrent invocation of
//! the methods it governs, so it holds no per-call state: the attempt count
//! is owned by the invocation and passed in.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Outcome of consulting a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop; the last failure becomes the invocation's failure.
    Decline,
    /// Try again after `delay`.
    Continue { delay: Duration },
}

/// Decides whether a failed transport attempt is retried.
pub trait Retry: Send + Sync + fmt::Debug {
    /// `attempt` is the 1-based number of the attempt that just failed.
    fn decide(&self, attempt: u32, error: &TransportError) -> RetryDecision;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl Retry for NoRetry {
    fn decide(&self, _attempt: u32, _error: &TransportError) -> RetryDecision {
        RetryDecision::Decline
    }
}

/// Retries until `max_attempts` attempts have been made, with exponential
/// backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountingRetry {
    max_attempts: u32,
    delay: Duration,
    multiplier: f64,
    max_delay: Duration,
}

impl CountingRetry {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::MAX,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(Duration::MAX)
            .min(self.max_delay)
    }
}

impl Retry for CountingRetry {
    fn decide(&self, attempt: u32, _error: &TransportError) -> RetryDecision {
        if attempt >= self.max_attempts {
            RetryDecision::Decline
        } else {
            RetryDecision::Continue {
                delay: self.delay_after(attempt),
            }
        }
    }
}

/// Declarative form of the built-in policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum RetryConfig {
    None,
    Counting {
        max_attempts: u32,
        #[serde(default, with = "humantime_serde")]
        delay: Option<Duration>,
        #[serde(default)]
        multiplier: Option<f64>,
        #[serde(default, with = "humantime_serde")]
        max_delay: Option<Duration>,
    },
}

impl RetryConfig {
    pub fn build(&self) -> std::sync::Arc<dyn Retry> {
        match self {
            RetryConfig::None => std::sync::Arc::new(NoRetry),
            RetryConfig::Counting {
                max_attempts,
                delay,
                multiplier,
                max_delay,
            } => {
                let mut retry = CountingRetry::new(*max_attempts);
                if let Some(delay) = delay {
                    retry = retry.with_delay(*delay);
                }
                if let Some(multiplier) = multiplier {
                    retry = retry.with_multiplier(*multiplier);
                }
                if let Some(max_delay) = max_delay {
                    retry = retry.with_max_delay(*max_delay);
                }
                std::sync::Arc::new(retry)
            }
        }
    }
}
