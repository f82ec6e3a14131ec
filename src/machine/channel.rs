//! Single-slot navigation channels.
//!
//! Every behaviour owns one [`NavigationChannel`]. The machine keeps exactly
//! one listener attached, on the active behaviour's channel, and moves it
//! on every switch. A signal on a channel with no listener is dropped;
//! nothing is buffered.

use crate::behaviour::{NavigationRequest, Notification, StructuralError};
use crate::core::State;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// Identity of an attached listener, so that `detach` only removes its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The listener accepted the request and the machine switched
    Delivered,
    /// Nobody was listening, or the listener belongs to a behaviour that is
    /// no longer active
    Dropped,
    /// A switch was already in progress; the signal was rejected
    Busy,
}

/// Callback attached to a channel.
pub type Listener<S> =
    Arc<dyn Fn(NavigationRequest<S>) -> Result<Delivery, StructuralError> + Send + Sync>;

/// Single-slot publish point.
pub struct NavigationChannel<S> {
    slot: Mutex<Option<(ListenerId, Listener<S>)>>,
}

impl<S> Default for NavigationChannel<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> NavigationChannel<S> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Attach `listener`, replacing whatever was attached before.
    pub fn attach(&self, id: ListenerId, listener: Listener<S>) {
        *self.slot.lock() = Some((id, listener));
    }

    /// Remove the listener if `id` is the one attached. Returns whether
    /// anything was removed.
    pub fn detach(&self, id: ListenerId) -> bool {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some((attached, _)) if *attached == id => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn attached(&self) -> Option<ListenerId> {
        self.slot.lock().as_ref().map(|(id, _)| *id)
    }

    /// Hand `request` to the attached listener, synchronously.
    ///
    /// The slot is not locked while the listener runs, so the listener may
    /// itself detach this channel.
    pub fn signal(&self, request: NavigationRequest<S>) -> Result<Delivery, StructuralError> {
        let listener = self.slot.lock().as_ref().map(|(_, l)| Arc::clone(l));
        match listener {
            Some(listener) => listener(request),
            None => {
                trace!(target_behaviour = %request.behaviour, "Signal on detached channel dropped");
                Ok(Delivery::Dropped)
            }
        }
    }
}

impl<S> fmt::Debug for NavigationChannel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationChannel")
            .field("attached", &self.attached())
            .finish()
    }
}

/// Handle through which a state raises its behaviour's notification.
///
/// A notifier is bound to one behaviour and to the state that was current
/// when it was created. Notifiers handed out by a machine are also bound to
/// the switch epoch they were created in, so once the machine has switched
/// away their signals are dropped, even if it later returns to the same
/// behaviour. A notifier is cheap to clone and can be moved to another
/// thread.
pub struct Notifier<S: State> {
    channel: Arc<NavigationChannel<S>>,
    navigator: Option<Notification<S>>,
    state: S,
    epoch: Option<u64>,
}

impl<S: State> Notifier<S> {
    pub fn new(
        channel: Arc<NavigationChannel<S>>,
        navigator: Option<Notification<S>>,
        state: S,
    ) -> Self {
        Self {
            channel,
            navigator,
            state,
            epoch: None,
        }
    }

    /// Bind the notifier to switch epoch `epoch`.
    pub fn bound_to(mut self, epoch: u64) -> Self {
        self.epoch = Some(epoch);
        self
    }

    pub fn epoch(&self) -> Option<u64> {
        self.epoch
    }

    /// Whether the bound behaviour has a notification navigator at all.
    pub fn can_notify(&self) -> bool {
        self.navigator.is_some()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Produce the next state from `trigger` and signal the channel.
    pub fn notify(&self, trigger: S::Trigger) -> Result<Delivery, StructuralError> {
        let Some(navigator) = &self.navigator else {
            trace!(state = self.state.name(), "No notification navigator, trigger dropped");
            return Ok(Delivery::Dropped);
        };
        let mut request = navigator.follow(&self.state, trigger);
        request.epoch = self.epoch;
        self.channel.signal(request)
    }
}

impl<S: State> Clone for Notifier<S> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
            navigator: self.navigator.clone(),
            state: self.state.clone(),
            epoch: self.epoch,
        }
    }
}

impl<S: State> fmt::Debug for Notifier<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("state", &self.state)
            .field("navigator", &self.navigator)
            .field("epoch", &self.epoch)
            .finish()
    }
}
