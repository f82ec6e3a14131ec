//! Behaviours: the transition table bound to one state type.

use crate::behaviour::navigator::{
    Continuation, NavigationRequest, Navigator, NavigatorKind, Notification, Recovery,
};
use crate::core::{KindHierarchy, KindOf, Kinded, State};
use crate::machine::{NavigationChannel, Notifier};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What a behaviour does once its entry action completes normally.
///
/// Continuation and notification exits are mutually exclusive.
pub enum Exit<S: State> {
    /// Nothing follows; the run ends here
    Terminal,
    /// Move on immediately
    Continue(Continuation<S>),
    /// Wait for a trigger on the behaviour's channel
    Notify(Notification<S>),
}

/// Result of processing one state.
#[derive(Clone, Debug, PartialEq)]
pub enum StepResult<S> {
    /// A navigator fired; the machine should switch
    Navigate(NavigationRequest<S>),

    /// Entry action done, the behaviour waits for a notification
    Await,

    /// Entry action done and nothing follows
    Complete,
}

/// Everything needed to define a behaviour, passed by value to
/// [`Behaviour::new`].
pub struct BehaviourConfig<S: State> {
    /// Name other navigators use to reach this behaviour
    pub name: String,
    /// State key (see [`State::name`]) this behaviour accepts
    pub state: String,
    pub exit: Exit<S>,
    /// Tried in order when the entry action fails
    pub recovery: Vec<Recovery<S>>,
}

/// Transition table and execution logic for one state type.
///
/// Each behaviour owns a [`NavigationChannel`]. While the behaviour is
/// active its channel is attached to the machine; notifications raised on
/// it request a switch.
pub struct Behaviour<S: State> {
    name: String,
    state: String,
    exit: Exit<S>,
    recovery: Vec<Recovery<S>>,
    channel: Arc<NavigationChannel<S>>,
}

impl<S: State> Behaviour<S> {
    pub fn new(config: BehaviourConfig<S>) -> Self {
        Self {
            name: config.name,
            state: config.state,
            exit: config.exit,
            recovery: config.recovery,
            channel: Arc::new(NavigationChannel::new()),
        }
    }

    /// A behaviour with no outgoing navigators.
    pub fn terminal(name: impl Into<String>, state: impl Into<String>) -> Self {
        Self::new(BehaviourConfig {
            name: name.into(),
            state: state.into(),
            exit: Exit::Terminal,
            recovery: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state_key(&self) -> &str {
        &self.state
    }

    pub fn exit(&self) -> &Exit<S> {
        &self.exit
    }

    pub fn recovery(&self) -> &[Recovery<S>] {
        &self.recovery
    }

    pub fn continuation(&self) -> Option<&Continuation<S>> {
        match &self.exit {
            Exit::Continue(nav) => Some(nav),
            _ => None,
        }
    }

    pub fn notification(&self) -> Option<&Notification<S>> {
        match &self.exit {
            Exit::Notify(nav) => Some(nav),
            _ => None,
        }
    }

    pub fn channel(&self) -> &Arc<NavigationChannel<S>> {
        &self.channel
    }

    /// True when the behaviour has no navigators of any kind.
    pub fn is_terminal(&self) -> bool {
        matches!(self.exit, Exit::Terminal) && self.recovery.is_empty()
    }

    pub fn accepts(&self, state: &S) -> bool {
        state.name() == self.state
    }

    /// Every outgoing navigator, exit first, then recovery in order.
    pub fn navigators(&self) -> Vec<&dyn Navigator> {
        let mut navigators: Vec<&dyn Navigator> = Vec::with_capacity(self.recovery.len() + 1);
        match &self.exit {
            Exit::Terminal => {}
            Exit::Continue(nav) => navigators.push(nav),
            Exit::Notify(nav) => navigators.push(nav),
        }
        navigators.extend(self.recovery.iter().map(|nav| nav as &dyn Navigator));
        navigators
    }

    /// Notification handle for `state` under this behaviour.
    pub fn notifier(&self, state: &S) -> Notifier<S> {
        Notifier::new(
            Arc::clone(&self.channel),
            self.notification().cloned(),
            state.clone(),
        )
    }

    /// Run the state's entry action and decide what follows.
    ///
    /// An error whose kind matches no recovery navigator is handed back
    /// unchanged.
    pub fn process_state(
        &self,
        state: &S,
        context: &mut S::Context,
        hierarchy: &KindHierarchy<KindOf<S>>,
    ) -> Result<StepResult<S>, S::Error> {
        self.step(state, context, hierarchy, None)
    }

    /// [`process_state`](Self::process_state) with the entry action's
    /// notifier bound to switch epoch `epoch`.
    pub(crate) fn process_state_at(
        &self,
        epoch: u64,
        state: &S,
        context: &mut S::Context,
        hierarchy: &KindHierarchy<KindOf<S>>,
    ) -> Result<StepResult<S>, S::Error> {
        self.step(state, context, hierarchy, Some(epoch))
    }

    fn step(
        &self,
        state: &S,
        context: &mut S::Context,
        hierarchy: &KindHierarchy<KindOf<S>>,
        epoch: Option<u64>,
    ) -> Result<StepResult<S>, S::Error> {
        let notifier = match epoch {
            Some(epoch) => self.notifier(state).bound_to(epoch),
            None => self.notifier(state),
        };

        match state.enter(context, &notifier) {
            Ok(()) => Ok(match &self.exit {
                Exit::Continue(nav) => StepResult::Navigate(nav.follow(state)),
                Exit::Notify(_) => StepResult::Await,
                Exit::Terminal => StepResult::Complete,
            }),
            Err(error) => {
                let kind = error.kind();
                let handled = self.recovery.iter().map(Recovery::handles);
                let Some(index) = hierarchy.first_match(&kind, handled) else {
                    return Err(error);
                };

                let nav = &self.recovery[index];
                debug!(
                    behaviour = %self.name,
                    kind = ?kind,
                    handled_as = ?nav.handles(),
                    target = nav.target(),
                    "Recovering from entry action failure"
                );
                Ok(StepResult::Navigate(nav.follow(state, &error)))
            }
        }
    }
}

impl<S: State> fmt::Debug for Behaviour<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exit = match &self.exit {
            Exit::Terminal => None,
            Exit::Continue(nav) => Some((NavigatorKind::Continuation, nav.targets())),
            Exit::Notify(nav) => Some((NavigatorKind::Notification, nav.targets())),
        };
        f.debug_struct("Behaviour")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("exit", &exit)
            .field("recovery", &self.recovery)
            .finish()
    }
}
