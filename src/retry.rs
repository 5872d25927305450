//! Bounded retry for the primary endpoint.
//!
//! Only [`GenerationError::ModelLoading`] is retried, with a fixed delay
//! between attempts. Every other failure aborts immediately so the caller can
//! map it to a message or cascade to the next endpoint.
//!
//! ```text
//! Idle ─► Attempting(n) ─┬─► Succeeded
//!                        ├─► Waiting(n+1) ─► Attempting(n+1)
//!                        └─► Failed
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::error::GenerationError;

/// Attempt limit and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

/// Position of a [`RetryController`] in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Nothing attempted yet.
    Idle,
    /// Attempt `attempt` (1-based) is in flight.
    Attempting {
        /// Current attempt number.
        attempt: u32,
    },
    /// Sleeping before attempt `next_attempt`.
    Waiting {
        /// Attempt that follows the delay.
        next_attempt: u32,
        /// Length of the delay.
        delay: Duration,
    },
    /// An attempt succeeded.
    Succeeded {
        /// Attempts used.
        attempts: u32,
    },
    /// Terminal failure: a non-retryable error or the attempt limit.
    Failed {
        /// Attempts used.
        attempts: u32,
    },
}

impl RetryState {
    /// Whether the controller has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetryError {
    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts used.
        attempts: u32,
        /// Error from the final attempt.
        last: GenerationError,
    },
    /// A non-retryable error ended the loop early.
    #[error("aborted on attempt {attempt}: {error}")]
    Aborted {
        /// Attempt that failed.
        attempt: u32,
        /// The non-retryable error.
        error: GenerationError,
    },
}

/// Drives one operation through the retry state machine.
#[derive(Debug)]
pub struct RetryController {
    policy: RetryPolicy,
    state: RetryState,
}

impl RetryController {
    /// Create an idle controller.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: RetryState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> RetryState {
        self.state
    }

    fn transition(&mut self, next: RetryState) {
        debug!(from = ?self.state, to = ?next, "retry transition");
        self.state = next;
    }

    /// Run `operation` until it succeeds, fails non-retryably, or the attempt
    /// limit is reached. `operation` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&mut self, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            self.transition(RetryState::Attempting { attempt });
            match operation(attempt).await {
                Ok(value) => {
                    self.transition(RetryState::Succeeded { attempts: attempt });
                    return Ok(value);
                }
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    info!(
                        attempt,
                        max_attempts,
                        delay_ms = self.policy.delay.as_millis() as u64,
                        error = %error,
                        "retryable failure, waiting before next attempt"
                    );
                    self.transition(RetryState::Waiting {
                        next_attempt: attempt + 1,
                        delay: self.policy.delay,
                    });
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                Err(error) if error.is_retryable() => {
                    warn!(attempts = attempt, error = %error, "retry attempts exhausted");
                    self.transition(RetryState::Failed { attempts: attempt });
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                Err(error) => {
                    self.transition(RetryState::Failed { attempts: attempt });
                    return Err(RetryError::Aborted { attempt, error });
                }
            }
        }
    }
}
