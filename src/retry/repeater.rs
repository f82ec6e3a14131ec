//! The retry loop.

use crate::core::{KindHierarchy, Kinded};
use crate::retry::context::AttemptContext;
use crate::retry::error::RetryError;
use crate::retry::policy::RetryPolicy;
use std::fmt;
use tracing::{debug, warn};

type Handler<'a, E> = Box<dyn FnMut(&E) + 'a>;

/// One entry of a repeater's catch list: an error kind, and optionally a
/// callback run with every error caught by this entry.
pub struct Catch<'a, E: Kinded> {
    kind: E::Kind,
    handler: Option<Handler<'a, E>>,
}

impl<'a, E: Kinded> Catch<'a, E> {
    /// Catch `kind` and its descendants silently.
    pub fn kind(kind: E::Kind) -> Self {
        Self {
            kind,
            handler: None,
        }
    }

    /// Catch `kind` and its descendants, calling `handler` with each one.
    pub fn with_handler<F>(kind: E::Kind, handler: F) -> Self
    where
        F: FnMut(&E) + 'a,
    {
        Self {
            kind,
            handler: Some(Box::new(handler)),
        }
    }

    pub fn handles(&self) -> &E::Kind {
        &self.kind
    }
}

impl<E: Kinded> fmt::Debug for Catch<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catch")
            .field("kind", &self.kind)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Runs a job until it succeeds, retrying caught failures within the
/// bounds of a [`RetryPolicy`].
///
/// Each failure is matched against the catch list in registration order;
/// the first entry whose kind equals the failure's kind, or is one of its
/// declared ancestors, handles it.
pub struct Repeater<'a, E: Kinded> {
    policy: RetryPolicy,
    hierarchy: KindHierarchy<E::Kind>,
    catches: Vec<Catch<'a, E>>,
}

impl<'a, E: Kinded> Repeater<'a, E> {
    pub fn new(
        policy: RetryPolicy,
        hierarchy: KindHierarchy<E::Kind>,
        catches: Vec<Catch<'a, E>>,
    ) -> Self {
        Self {
            policy,
            hierarchy,
            catches,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `job` to success, an uncaught error, or exhausted bounds.
    ///
    /// The policy is consulted before every attempt, including the first.
    pub fn run<T, F>(&mut self, mut job: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut context = AttemptContext::start();
        let mut last = None;

        loop {
            let reached = self.policy.reached(&context);
            if !reached.is_empty() {
                warn!(
                    attempts = context.attempt,
                    bounds = ?reached,
                    "Retry bounds exhausted"
                );
                return Err(RetryError::Exhausted {
                    attempts: context.attempt,
                    last,
                });
            }

            let error = match job() {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            context = context.next();

            let kind = error.kind();
            let handled = self.catches.iter().map(Catch::handles);
            let Some(index) = self.hierarchy.first_match(&kind, handled) else {
                warn!(attempt = context.attempt, kind = ?kind, "Uncaught error, giving up");
                return Err(RetryError::Unrecovered(error));
            };

            let catch = &mut self.catches[index];
            debug!(
                attempt = context.attempt,
                kind = ?kind,
                caught_as = ?catch.kind,
                "Caught error, retrying"
            );
            if let Some(handler) = catch.handler.as_mut() {
                handler(&error);
            }
            last = Some(error);
        }
    }
}

impl<E: Kinded> fmt::Debug for Repeater<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repeater")
            .field("policy", &self.policy)
            .field("catches", &self.catches)
            .finish()
    }
}
