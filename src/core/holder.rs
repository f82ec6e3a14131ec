//! Non-blocking exclusive hold.
//!
//! A [`Holder`] guards "only one operation in flight" without ever blocking:
//! [`Holder::try_hold`] either hands out a scoped [`HoldToken`] or returns
//! `None` straight away. Dropping the token frees the holder and runs the
//! optional release callback, on every exit path including unwinding.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

type ReleaseCallback = Box<dyn Fn() + Send + Sync>;

/// Exclusive, non-reentrant, non-blocking hold.
///
/// # Example
///
/// ```rust
/// use waypoint::core::Holder;
///
/// let holder = Holder::new();
///
/// let token = holder.try_hold().expect("holder starts free");
/// assert!(holder.is_holding());
/// assert!(holder.try_hold().is_none());
///
/// drop(token);
/// assert!(!holder.is_holding());
/// ```
#[derive(Default)]
pub struct Holder {
    held: AtomicBool,
    on_release: Option<ReleaseCallback>,
}

impl Holder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A holder that calls `on_release` every time a token is dropped.
    pub fn with_release<F>(on_release: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            held: AtomicBool::new(false),
            on_release: Some(Box::new(on_release)),
        }
    }

    pub fn is_holding(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Take the hold if it is free. Never waits.
    pub fn try_hold(&self) -> Option<HoldToken<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| HoldToken { holder: self })
    }
}

impl fmt::Debug for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Holder")
            .field("held", &self.is_holding())
            .field("on_release", &self.on_release.is_some())
            .finish()
    }
}

/// Proof of an acquired hold. Releases it when dropped.
#[must_use = "the hold is released as soon as the token is dropped"]
pub struct HoldToken<'a> {
    holder: &'a Holder,
}

impl Drop for HoldToken<'_> {
    fn drop(&mut self) {
        self.holder.held.store(false, Ordering::Release);
        if let Some(callback) = &self.holder.on_release {
            callback();
        }
    }
}

impl fmt::Debug for HoldToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoldToken").finish_non_exhaustive()
    }
}
