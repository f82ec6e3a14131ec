//! Bounded retry of a single job, recovering by error kind.
//!
//! A [`Repeater`] runs a zero-argument job until it succeeds. A failure is
//! retried only when its kind matches one of the registered [`Catch`]
//! entries, using the same first-registered, ancestor-aware matching the
//! state machine applies to recovery navigators. Anything else is returned
//! to the caller untouched.
//!
//! How long the loop may keep going is described by a [`RetryPolicy`], a
//! plain value that can also be loaded from configuration.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use waypoint::error_kinds;
//! use waypoint::retry::{Catch, Repeater, RetryPolicy};
//!
//! error_kinds! {
//!     enum JobKind { Io, Timeout: [Io] }
//! }
//!
//! let calls = Cell::new(0);
//! let mut repeater: Repeater<JobKind> = Repeater::new(
//!     RetryPolicy::attempts(5),
//!     JobKind::hierarchy(),
//!     vec![Catch::kind(JobKind::Io)],
//! );
//!
//! let value = repeater.run(|| {
//!     calls.set(calls.get() + 1);
//!     if calls.get() < 3 { Err(JobKind::Timeout) } else { Ok(calls.get()) }
//! });
//!
//! assert_eq!(value.unwrap(), 3);
//! ```

pub mod context;
pub mod error;
pub mod policy;
pub mod repeater;

pub use context::AttemptContext;
pub use error::{BoundReached, RetryError};
pub use policy::{RetryPolicy, StopWhen};
pub use repeater::{Catch, Repeater};
