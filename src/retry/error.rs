//! Retry errors and exhausted bounds.

use std::time::Duration;
use thiserror::Error;

/// A retry bound that has no room left.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoundReached {
    #[error("Maximum attempts ({max}) reached")]
    Attempts { max: usize },

    #[error("Timeout ({timeout:?}) reached (elapsed: {elapsed:?})")]
    Timeout {
        timeout: Duration,
        elapsed: Duration,
    },
}

/// Why a retry loop gave up.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The job failed with an error no catch entry handles. Returned as is.
    #[error("Job failed with an uncaught error: {0:?}")]
    Unrecovered(E),

    /// Every failure was caught but the policy allows no further attempt.
    /// `last` is the most recent caught error, if any attempt was made.
    #[error("Retry bounds exhausted after {attempts} attempt(s)")]
    Exhausted { attempts: usize, last: Option<E> },
}

impl<E> RetryError<E> {
    pub fn unrecovered(&self) -> Option<&E> {
        match self {
            Self::Unrecovered(error) => Some(error),
            Self::Exhausted { .. } => None,
        }
    }

    /// The error behind the failure, whichever way the loop ended.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Unrecovered(error) => Some(error),
            Self::Exhausted { last, .. } => last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_reports_attempts() {
        let err: RetryError<&str> = RetryError::Exhausted {
            attempts: 3,
            last: Some("busy"),
        };

        assert_eq!(err.to_string(), "Retry bounds exhausted after 3 attempt(s)");
        assert!(err.unrecovered().is_none());
        assert_eq!(err.into_inner(), Some("busy"));
    }

    #[test]
    fn unrecovered_keeps_the_error() {
        let err: RetryError<&str> = RetryError::Unrecovered("denied");

        assert_eq!(err.unrecovered(), Some(&"denied"));
        assert_eq!(err.into_inner(), Some("denied"));
    }

    #[test]
    fn bound_messages() {
        assert_eq!(
            BoundReached::Attempts { max: 4 }.to_string(),
            "Maximum attempts (4) reached"
        );
    }
}
