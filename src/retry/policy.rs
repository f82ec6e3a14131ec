//! Retry bounds and the rule that combines them.

use crate::retry::context::AttemptContext;
use crate::retry::error::BoundReached;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// How the two bounds of a [`RetryPolicy`] combine.
///
/// The default, [`AnyBoundReached`](Self::AnyBoundReached), treats each
/// bound as a hard limit. Loops written as "retry while there is time left
/// or attempts left" behave like [`AllBoundsReached`](Self::AllBoundsReached)
/// instead; select it explicitly to keep that behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWhen {
    /// Stop as soon as either bound is reached. Keeps going only while both
    /// the time and the attempt budget have room.
    #[default]
    AnyBoundReached,

    /// Keep going while either bound still has room; stop only once both are
    /// reached. An unset bound is never reached, so with one bound unset the
    /// loop ends only on success or an uncaught error.
    AllBoundsReached,
}

/// Bounds on a retry loop.
///
/// Both bounds default to unset, meaning unbounded. Loaded from
/// configuration, the timeout is given in milliseconds:
///
/// ```json
/// { "timeout_ms": 30000, "max_attempts": 5, "stop_when": "any_bound_reached" }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Option<Duration>,
    pub max_attempts: Option<usize>,
    pub stop_when: StopWhen,
}

impl RetryPolicy {
    /// No bounds at all.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// At most `max` attempts, no timeout.
    pub fn attempts(max: usize) -> Self {
        Self {
            max_attempts: Some(max),
            ..Self::default()
        }
    }

    /// No new attempt once `timeout` has elapsed.
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Every configured bound that has no room left, accumulated.
    pub fn check(&self, context: &AttemptContext) -> Validation<(), NonEmptyVec<BoundReached>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<BoundReached>>> = Vec::new();

        if let Some(max) = self.max_attempts {
            checks.push(if context.attempt >= max {
                Validation::fail(BoundReached::Attempts { max })
            } else {
                Validation::success(())
            });
        }

        if let Some(timeout) = self.timeout {
            let elapsed = context.elapsed();
            checks.push(if elapsed >= timeout {
                Validation::fail(BoundReached::Timeout { timeout, elapsed })
            } else {
                Validation::success(())
            });
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Whether another attempt may start.
    pub fn permits(&self, context: &AttemptContext) -> bool {
        self.reached(context).is_empty()
    }

    /// The bounds that stop the loop under this policy's [`StopWhen`] rule.
    /// Empty while another attempt is allowed.
    pub fn reached(&self, context: &AttemptContext) -> Vec<BoundReached> {
        let reached: Vec<BoundReached> = match self.check(context) {
            Validation::Success(_) => return Vec::new(),
            Validation::Failure(errors) => errors.iter().cloned().collect(),
        };

        match self.stop_when {
            StopWhen::AnyBoundReached => reached,
            StopWhen::AllBoundsReached if reached.len() == self.bound_count() => reached,
            StopWhen::AllBoundsReached => Vec::new(),
        }
    }

    fn bound_count(&self) -> usize {
        usize::from(self.timeout.is_some()) + usize::from(self.max_attempts.is_some())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
