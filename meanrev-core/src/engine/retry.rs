//! Bounded, immediate retry.
//!
//! Used only for stop modification. Entries are never retried: a duplicate
//! entry is worse than a missed one. There is no sleep between attempts.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (at least 1).
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// All attempts failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    pub fn run<T, E: Display>(
        &self,
        mut op: impl FnMut() -> Result<T, E>,
    ) -> Result<T, RetryExhausted<E>> {
        let max = self.attempts();
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    })
                }
                Err(e) => {
                    tracing::debug!(error = %e, attempt, max_attempts = max, "retrying");
                    attempt += 1;
                }
            }
        }
    }
}
