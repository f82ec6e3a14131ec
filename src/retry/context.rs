//! Progress of a retry loop, as seen by its policy.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Where a retry loop stands before its next attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptContext {
    /// Attempts already made
    pub attempt: usize,
    pub started_at: DateTime<Utc>,
}

impl AttemptContext {
    pub fn start() -> Self {
        Self {
            attempt: 0,
            started_at: Utc::now(),
        }
    }

    /// Context after one more attempt.
    pub fn next(self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self
        }
    }

    /// Time since the loop started; zero if the clock went backwards.
    pub fn elapsed(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
