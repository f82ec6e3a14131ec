//! Navigators: the outgoing transitions of a behaviour.
//!
//! There is one type per navigator kind so that a behaviour's slots can only
//! hold the kind they expect. All of them share the [`Navigator`] trait for
//! code that only cares about where a transition leads.

use crate::core::{KindOf, State};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

type ContinueFn<S> = Arc<dyn Fn(&S) -> (String, S) + Send + Sync>;
type NotifyFn<S> = Arc<dyn Fn(&S, <S as State>::Trigger) -> S + Send + Sync>;
type RecoverFn<S> = Arc<dyn Fn(&S, &<S as State>::Error) -> S + Send + Sync>;

/// Which of the three transition kinds a navigator is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigatorKind {
    /// Fires as soon as the entry action completes
    Continuation,
    /// Fires when the behaviour's channel is signalled
    Notification,
    /// Fires when the entry action fails with a matching error kind
    Recovery,
}

impl fmt::Display for NavigatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuation => f.write_str("continuation"),
            Self::Notification => f.write_str("notification"),
            Self::Recovery => f.write_str("recovery"),
        }
    }
}

/// A request to install `state` under the behaviour named `behaviour`.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationRequest<S> {
    pub behaviour: String,
    pub state: S,
    /// Navigator that produced the request; `None` for direct switches
    pub via: Option<NavigatorKind>,
    /// Switch epoch the request was issued in. A request carrying an epoch
    /// is dropped once the machine has switched past it.
    pub epoch: Option<u64>,
}

impl<S> NavigationRequest<S> {
    pub fn new(behaviour: impl Into<String>, state: S) -> Self {
        Self {
            behaviour: behaviour.into(),
            state,
            via: None,
            epoch: None,
        }
    }
}

/// Common view of every navigator.
pub trait Navigator {
    fn kind(&self) -> NavigatorKind;

    /// Every behaviour this navigator may lead to.
    fn targets(&self) -> &[String];
}

/// Transition taken after a successful entry action.
///
/// A continuation normally leads to one behaviour. A branching continuation
/// declares every behaviour it may lead to and picks one from the state.
pub struct Continuation<S: State> {
    targets: Vec<String>,
    produce: ContinueFn<S>,
}

impl<S: State> Continuation<S> {
    pub fn new<F>(target: impl Into<String>, produce: F) -> Self
    where
        F: Fn(&S) -> S + Send + Sync + 'static,
    {
        let target = target.into();
        Self {
            targets: vec![target.clone()],
            produce: Arc::new(move |state| (target.clone(), produce(state))),
        }
    }

    /// A continuation that chooses its target from the completed state.
    ///
    /// `choose` must only return names listed in `targets`; the registry
    /// validates the declared list, and a switch to anything else fails as
    /// an unknown behaviour.
    pub fn branching<I, T, F, N>(targets: I, choose: F) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
        F: Fn(&S) -> (N, S) + Send + Sync + 'static,
        N: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            produce: Arc::new(move |state| {
                let (target, next) = choose(state);
                (target.into(), next)
            }),
        }
    }

    pub fn follow(&self, state: &S) -> NavigationRequest<S> {
        let (behaviour, state) = (self.produce)(state);
        NavigationRequest {
            behaviour,
            state,
            via: Some(NavigatorKind::Continuation),
            epoch: None,
        }
    }
}

/// Transition taken when the behaviour's channel receives a trigger.
pub struct Notification<S: State> {
    target: String,
    produce: NotifyFn<S>,
}

impl<S: State> Notification<S> {
    pub fn new<F>(target: impl Into<String>, produce: F) -> Self
    where
        F: Fn(&S, S::Trigger) -> S + Send + Sync + 'static,
    {
        Self {
            target: target.into(),
            produce: Arc::new(produce),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn follow(&self, state: &S, trigger: S::Trigger) -> NavigationRequest<S> {
        NavigationRequest {
            behaviour: self.target.clone(),
            state: (self.produce)(state, trigger),
            via: Some(NavigatorKind::Notification),
            epoch: None,
        }
    }
}

/// Transition taken when the entry action fails with `handles` or one of
/// its declared descendants.
pub struct Recovery<S: State> {
    target: String,
    handles: KindOf<S>,
    produce: RecoverFn<S>,
}

impl<S: State> Recovery<S> {
    pub fn new<F>(target: impl Into<String>, handles: KindOf<S>, produce: F) -> Self
    where
        F: Fn(&S, &S::Error) -> S + Send + Sync + 'static,
    {
        Self {
            target: target.into(),
            handles,
            produce: Arc::new(produce),
        }
    }

    /// The error kind this navigator was registered for.
    pub fn handles(&self) -> &KindOf<S> {
        &self.handles
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn follow(&self, state: &S, error: &S::Error) -> NavigationRequest<S> {
        NavigationRequest {
            behaviour: self.target.clone(),
            state: (self.produce)(state, error),
            via: Some(NavigatorKind::Recovery),
            epoch: None,
        }
    }
}

impl<S: State> Navigator for Continuation<S> {
    fn kind(&self) -> NavigatorKind {
        NavigatorKind::Continuation
    }

    fn targets(&self) -> &[String] {
        &self.targets
    }
}

impl<S: State> Navigator for Notification<S> {
    fn kind(&self) -> NavigatorKind {
        NavigatorKind::Notification
    }

    fn targets(&self) -> &[String] {
        std::slice::from_ref(&self.target)
    }
}

impl<S: State> Navigator for Recovery<S> {
    fn kind(&self) -> NavigatorKind {
        NavigatorKind::Recovery
    }

    fn targets(&self) -> &[String] {
        std::slice::from_ref(&self.target)
    }
}

impl<S: State> Clone for Continuation<S> {
    fn clone(&self) -> Self {
        Self {
            targets: self.targets.clone(),
            produce: Arc::clone(&self.produce),
        }
    }
}

impl<S: State> Clone for Notification<S> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            produce: Arc::clone(&self.produce),
        }
    }
}

impl<S: State> Clone for Recovery<S> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            handles: self.handles.clone(),
            produce: Arc::clone(&self.produce),
        }
    }
}

impl<S: State> fmt::Debug for Continuation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl<S: State> fmt::Debug for Notification<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<S: State> fmt::Debug for Recovery<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery")
            .field("target", &self.target)
            .field("handles", &self.handles)
            .finish_non_exhaustive()
    }
}
