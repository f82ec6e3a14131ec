//! State machine that drives behaviours.

use crate::behaviour::{
    BehaviourRegistry, NavigationRequest, StepResult, StructuralError,
};
use crate::core::{Holder, Kinded, State, SwitchHistory, SwitchRecord};
use crate::machine::channel::{Delivery, Listener, ListenerId, Notifier};
use crate::machine::error::{RunError, SwitchError};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// How a run ended successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// A behaviour with no way forward finished its entry action
    Completed { behaviour: String, steps: usize },

    /// The active behaviour waits for a notification; call `run` again once
    /// it has been delivered
    Awaiting { behaviour: String, steps: usize },
}

impl RunOutcome {
    pub fn steps(&self) -> usize {
        match self {
            Self::Completed { steps, .. } | Self::Awaiting { steps, .. } => *steps,
        }
    }

    pub fn behaviour(&self) -> &str {
        match self {
            Self::Completed { behaviour, .. } | Self::Awaiting { behaviour, .. } => behaviour,
        }
    }
}

struct Cursor<S> {
    state: S,
    behaviour: String,
    /// Bumped on every switch; requests carrying an older epoch are dropped.
    epoch: u64,
    /// Set while `run_until` is stepping.
    running: bool,
    /// Structural failure raised through a channel during a run, reported
    /// by the run after the current step.
    fault: Option<StructuralError>,
    history: SwitchHistory,
}

/// State shared between the machine and the listener it keeps attached.
struct Shared<S: State> {
    id: Uuid,
    registry: BehaviourRegistry<S>,
    cursor: Mutex<Cursor<S>>,
    switching: Holder,
    listener: ListenerId,
}

impl<S: State> Shared<S> {
    /// Switch unless another switch is in progress.
    fn switch(
        self: &Arc<Self>,
        expected: Option<u64>,
        request: NavigationRequest<S>,
    ) -> Result<Delivery, SwitchError> {
        let Some(_hold) = self.switching.try_hold() else {
            trace!(machine = %self.id, target_behaviour = %request.behaviour, "Switch rejected, another is in progress");
            return Err(SwitchError::InProgress);
        };
        Ok(self.apply(expected, request)?)
    }

    /// Switch once any switch in progress has finished.
    fn switch_after(
        self: &Arc<Self>,
        expected: u64,
        request: NavigationRequest<S>,
    ) -> Result<Delivery, StructuralError> {
        let _hold = loop {
            match self.switching.try_hold() {
                Some(hold) => break hold,
                None => std::thread::yield_now(),
            }
        };
        self.apply(Some(expected), request)
    }

    /// The single mutation point; callers hold `switching`.
    ///
    /// With `expected` set, the switch only applies if no other switch has
    /// happened since that epoch; otherwise the request is stale and is
    /// dropped before it is validated.
    fn apply(
        self: &Arc<Self>,
        expected: Option<u64>,
        request: NavigationRequest<S>,
    ) -> Result<Delivery, StructuralError> {
        let mut guard = self.cursor.lock();
        let cursor = &mut *guard;
        if expected.is_some_and(|epoch| epoch != cursor.epoch) {
            trace!(machine = %self.id, target_behaviour = %request.behaviour, "Stale navigation request dropped");
            return Ok(Delivery::Dropped);
        }

        let next = self.registry.resolve(&request.behaviour)?;
        if !next.accepts(&request.state) {
            return Err(StructuralError::StateMismatch {
                behaviour: next.name().to_string(),
                expected: next.state_key().to_string(),
                found: request.state.name().to_string(),
            });
        }

        if let Some(current) = self.registry.get(&cursor.behaviour) {
            current.channel().detach(self.listener);
        }

        let from = std::mem::replace(&mut cursor.behaviour, request.behaviour);
        cursor.state = request.state;
        cursor.epoch += 1;
        cursor.history.record(SwitchRecord {
            from: Some(from.clone()),
            to: cursor.behaviour.clone(),
            state: cursor.state.name().to_string(),
            via: request.via,
            timestamp: Utc::now(),
        });

        next.channel().attach(self.listener, self.listener_for(cursor.epoch));

        debug!(
            machine = %self.id,
            from = %from,
            to = %cursor.behaviour,
            via = ?request.via,
            "Switched behaviour"
        );
        Ok(Delivery::Delivered)
    }

    /// Listener for the channel of the behaviour entered at `epoch`.
    /// Requests that carry their own epoch are checked against that one.
    fn listener_for(self: &Arc<Self>, epoch: u64) -> Listener<S> {
        let shared: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |request| {
            let Some(shared) = shared.upgrade() else {
                return Ok(Delivery::Dropped);
            };
            let expected = request.epoch.unwrap_or(epoch);
            match shared.switch(Some(expected), request) {
                Ok(delivery) => Ok(delivery),
                Err(SwitchError::InProgress) => Ok(Delivery::Busy),
                Err(SwitchError::Structural(error)) => {
                    let mut cursor = shared.cursor.lock();
                    if cursor.running {
                        cursor.fault = Some(error.clone());
                    }
                    Err(error)
                }
            }
        })
    }
}

/// Orchestrator holding the current state, the active behaviour and the
/// shared context.
///
/// Entry actions run on the thread that calls [`run`](Self::run). Switches
/// may also be requested from other threads through notifiers; they are
/// serialized by a non-blocking hold, and a notification that finds a
/// switch already in progress is rejected rather than queued.
pub struct StateMachine<S: State> {
    shared: Arc<Shared<S>>,
    context: S::Context,
}

impl<S: State> StateMachine<S> {
    /// Create a machine positioned on `initial_state` under
    /// `initial_behaviour`.
    pub fn new(
        registry: BehaviourRegistry<S>,
        context: S::Context,
        initial_behaviour: &str,
        initial_state: S,
    ) -> Result<Self, StructuralError> {
        let behaviour = registry.resolve(initial_behaviour)?;
        if !behaviour.accepts(&initial_state) {
            return Err(StructuralError::StateMismatch {
                behaviour: initial_behaviour.to_string(),
                expected: behaviour.state_key().to_string(),
                found: initial_state.name().to_string(),
            });
        }

        let mut history = SwitchHistory::new();
        history.record(SwitchRecord {
            from: None,
            to: initial_behaviour.to_string(),
            state: initial_state.name().to_string(),
            via: None,
            timestamp: Utc::now(),
        });

        let shared = Arc::new(Shared {
            id: Uuid::new_v4(),
            registry,
            cursor: Mutex::new(Cursor {
                state: initial_state,
                behaviour: initial_behaviour.to_string(),
                epoch: 0,
                running: false,
                fault: None,
                history,
            }),
            switching: Holder::new(),
            listener: ListenerId::new(),
        });

        if let Some(behaviour) = shared.registry.get(initial_behaviour) {
            behaviour
                .channel()
                .attach(shared.listener, shared.listener_for(0));
        }
        debug!(machine = %shared.id, behaviour = initial_behaviour, "State machine created");

        Ok(Self { shared, context })
    }

    /// Keep at most `limit` switch records, dropping the oldest first.
    pub fn with_history_limit(self, limit: usize) -> Self {
        self.shared.cursor.lock().history.set_limit(Some(limit));
        self
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn registry(&self) -> &BehaviourRegistry<S> {
        &self.shared.registry
    }

    pub fn current_state(&self) -> S {
        self.shared.cursor.lock().state.clone()
    }

    pub fn current_behaviour(&self) -> String {
        self.shared.cursor.lock().behaviour.clone()
    }

    /// Snapshot of the switch history.
    pub fn history(&self) -> SwitchHistory {
        self.shared.cursor.lock().history.clone()
    }

    /// Most recent switch, without copying the whole history.
    pub fn last_switch(&self) -> Option<SwitchRecord> {
        self.shared.cursor.lock().history.last().cloned()
    }

    pub fn context(&self) -> &S::Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut S::Context {
        &mut self.context
    }

    /// Notifier bound to the active behaviour, the current state and the
    /// current switch epoch, for event sources outside the entry actions.
    pub fn notifier(&self) -> Result<Notifier<S>, StructuralError> {
        let cursor = self.shared.cursor.lock();
        let behaviour = self.shared.registry.resolve(&cursor.behaviour)?;
        Ok(behaviour.notifier(&cursor.state).bound_to(cursor.epoch))
    }

    /// Install `state` under `behaviour` directly.
    ///
    /// Used to reposition a machine, for instance after an unrecovered
    /// error. Fails without touching anything if the behaviour is unknown,
    /// does not accept the state, or another switch is in progress.
    pub fn switch(&self, behaviour: impl Into<String>, state: S) -> Result<(), SwitchError> {
        self.shared
            .switch(None, NavigationRequest::new(behaviour, state))
            .map(|_| ())
    }

    /// Step until a terminal behaviour completes, a notification is awaited,
    /// or an error escapes.
    pub fn run(&mut self) -> Result<RunOutcome, RunError<S::Error>> {
        self.run_until(|| false)
    }

    /// Like [`run`](Self::run), checking `cancelled` before every step.
    ///
    /// Only structural failures raised while the run is active are reported
    /// by it; a failed notification outside a run is returned to its
    /// signaller alone.
    pub fn run_until<F>(&mut self, mut cancelled: F) -> Result<RunOutcome, RunError<S::Error>>
    where
        F: FnMut() -> bool,
    {
        {
            let mut cursor = self.shared.cursor.lock();
            cursor.running = true;
            cursor.fault = None;
        }

        let result = self.drive(&mut cancelled);

        let mut cursor = self.shared.cursor.lock();
        cursor.running = false;
        cursor.fault = None;
        result
    }

    fn drive<F>(&mut self, cancelled: &mut F) -> Result<RunOutcome, RunError<S::Error>>
    where
        F: FnMut() -> bool,
    {
        let mut steps = 0;

        loop {
            let (state, name, epoch) = {
                let cursor = self.shared.cursor.lock();
                (cursor.state.clone(), cursor.behaviour.clone(), cursor.epoch)
            };

            if cancelled() {
                info!(machine = %self.shared.id, behaviour = %name, steps, "Run cancelled");
                return Err(RunError::Cancelled { behaviour: name });
            }

            let behaviour = self.shared.registry.resolve(&name)?;
            debug!(
                machine = %self.shared.id,
                behaviour = %name,
                state = state.name(),
                step = steps,
                "Entering state"
            );
            steps += 1;

            let step = behaviour.process_state_at(
                epoch,
                &state,
                &mut self.context,
                self.shared.registry.hierarchy(),
            );

            if let Some(fault) = self.shared.cursor.lock().fault.take() {
                warn!(machine = %self.shared.id, error = %fault, "Notification switch failed");
                return Err(fault.into());
            }

            let step = match step {
                Ok(step) => step,
                Err(error) => {
                    warn!(
                        machine = %self.shared.id,
                        behaviour = %name,
                        kind = ?error.kind(),
                        "Unrecovered error, run stopped"
                    );
                    return Err(RunError::Unrecovered(error));
                }
            };

            match step {
                StepResult::Navigate(request) => {
                    // A switch from another thread finishes first; if it
                    // moved the machine, this step's request is stale.
                    if self.shared.switch_after(epoch, request)? == Delivery::Dropped {
                        debug!(machine = %self.shared.id, behaviour = %name, "Step superseded by a notification");
                    }
                }
                StepResult::Complete => {
                    info!(machine = %self.shared.id, behaviour = %name, steps, "Run completed");
                    return Ok(RunOutcome::Completed {
                        behaviour: name,
                        steps,
                    });
                }
                StepResult::Await => {
                    if self.shared.cursor.lock().epoch == epoch {
                        info!(machine = %self.shared.id, behaviour = %name, steps, "Awaiting notification");
                        return Ok(RunOutcome::Awaiting {
                            behaviour: name,
                            steps,
                        });
                    }
                }
            }
        }
    }
}

impl<S: State> Drop for StateMachine<S> {
    fn drop(&mut self) {
        let cursor = self.shared.cursor.lock();
        if let Some(behaviour) = self.shared.registry.get(&cursor.behaviour) {
            behaviour.channel().detach(self.shared.listener);
        }
    }
}
