//! End-to-end workflows driven through the public API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use waypoint::behaviour::{
    Behaviour, BehaviourConfig, BehaviourRegistry, BuildError, Continuation, Exit, NavigatorKind,
    Notification, Recovery, StructuralError,
};
use waypoint::core::State;
use waypoint::error_kinds;
use waypoint::machine::{Delivery, Notifier, RunError, RunOutcome, StateMachine, SwitchError};

error_kinds! {
    pub enum JobKind {
        Any,
        Io: [Any],
        Timeout: [Io],
        Invalid: [Any],
        Fatal,
    }
}

type Activations = HashMap<&'static str, usize>;

fn activations(log: &Activations, name: &str) -> usize {
    log.get(name).copied().unwrap_or(0)
}

mod counting {
    use super::*;

    #[derive(Clone, Debug)]
    pub enum Step {
        Worker { cycle: u32 },
        Print { cycle: u32 },
        Done,
    }

    impl State for Step {
        type Context = Activations;
        type Error = JobKind;
        type Trigger = ();

        fn name(&self) -> &str {
            match self {
                Self::Worker { .. } => "Worker",
                Self::Print { .. } => "Print",
                Self::Done => "Done",
            }
        }

        fn enter(&self, log: &mut Activations, _: &Notifier<Self>) -> Result<(), JobKind> {
            let name = match self {
                Self::Worker { .. } => "Worker",
                Self::Print { .. } => "Print",
                Self::Done => "Done",
            };
            *log.entry(name).or_default() += 1;
            Ok(())
        }
    }

    pub fn machine(cycles: u32) -> StateMachine<Step> {
        let registry = BehaviourRegistry::new(
            JobKind::hierarchy(),
            vec![
                Behaviour::new(BehaviourConfig {
                    name: "Worker".to_string(),
                    state: "Worker".to_string(),
                    exit: Exit::Continue(Continuation::new("Print", |step: &Step| match step {
                        Step::Worker { cycle } => Step::Print { cycle: *cycle },
                        other => other.clone(),
                    })),
                    recovery: Vec::new(),
                }),
                Behaviour::new(BehaviourConfig {
                    name: "Print".to_string(),
                    state: "Print".to_string(),
                    exit: Exit::Continue(Continuation::branching(
                        ["Worker", "Done"],
                        move |step: &Step| match step {
                            Step::Print { cycle } if *cycle < cycles => {
                                ("Worker", Step::Worker { cycle: cycle + 1 })
                            }
                            _ => ("Done", Step::Done),
                        },
                    )),
                    recovery: Vec::new(),
                }),
                Behaviour::terminal("Done", "Done"),
            ],
        )
        .unwrap();

        StateMachine::new(registry, Activations::new(), "Worker", Step::Worker { cycle: 1 })
            .unwrap()
    }
}

mod fetching {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Fetch {
        Request { fail_with: Option<JobKind> },
        Backoff { cause: JobKind },
        Rejected,
        Stored,
    }

    impl State for Fetch {
        type Context = Activations;
        type Error = JobKind;
        type Trigger = ();

        fn name(&self) -> &str {
            match self {
                Self::Request { .. } => "Request",
                Self::Backoff { .. } => "Backoff",
                Self::Rejected => "Rejected",
                Self::Stored => "Stored",
            }
        }

        fn enter(&self, log: &mut Activations, _: &Notifier<Self>) -> Result<(), JobKind> {
            let name = match self {
                Self::Request { .. } => "Request",
                Self::Backoff { .. } => "Backoff",
                Self::Rejected => "Rejected",
                Self::Stored => "Stored",
            };
            *log.entry(name).or_default() += 1;
            match self {
                Self::Request {
                    fail_with: Some(kind),
                } => Err(*kind),
                _ => Ok(()),
            }
        }
    }

    pub fn machine(fail_with: Option<JobKind>) -> StateMachine<Fetch> {
        let registry = BehaviourRegistry::new(
            JobKind::hierarchy(),
            vec![
                Behaviour::new(BehaviourConfig {
                    name: "Request".to_string(),
                    state: "Request".to_string(),
                    exit: Exit::Continue(Continuation::new("Stored", |_: &Fetch| Fetch::Stored)),
                    recovery: vec![
                        Recovery::new("Backoff", JobKind::Io, |_: &Fetch, e: &JobKind| {
                            Fetch::Backoff { cause: *e }
                        }),
                        Recovery::new("Rejected", JobKind::Any, |_: &Fetch, _: &JobKind| {
                            Fetch::Rejected
                        }),
                    ],
                }),
                Behaviour::new(BehaviourConfig {
                    name: "Backoff".to_string(),
                    state: "Backoff".to_string(),
                    exit: Exit::Continue(Continuation::new("Request", |_: &Fetch| {
                        Fetch::Request { fail_with: None }
                    })),
                    recovery: Vec::new(),
                }),
                Behaviour::terminal("Rejected", "Rejected"),
                Behaviour::terminal("Stored", "Stored"),
            ],
        )
        .unwrap();

        StateMachine::new(
            registry,
            Activations::new(),
            "Request",
            Fetch::Request { fail_with },
        )
        .unwrap()
    }
}

mod ringing {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Bell {
        /// Rings its own bell from the entry action when `eager` is set
        Waiting { eager: bool },
        Answered(String),
        Misfiled,
    }

    impl State for Bell {
        type Context = Vec<String>;
        type Error = JobKind;
        type Trigger = String;

        fn name(&self) -> &str {
            match self {
                Self::Waiting { .. } => "Waiting",
                Self::Answered(_) => "Answered",
                Self::Misfiled => "Misfiled",
            }
        }

        fn enter(&self, log: &mut Vec<String>, notifier: &Notifier<Self>) -> Result<(), JobKind> {
            log.push(self.name().to_string());
            if let Self::Waiting { eager: true } = self {
                notifier
                    .notify("self".to_string())
                    .map_err(|_| JobKind::Fatal)?;
            }
            Ok(())
        }
    }

    /// `misfile` makes the notification produce a state its target does not
    /// accept.
    pub fn machine(eager: bool, misfile: bool) -> StateMachine<Bell> {
        let registry = BehaviourRegistry::new(
            JobKind::hierarchy(),
            vec![
                Behaviour::new(BehaviourConfig {
                    name: "Waiting".to_string(),
                    state: "Waiting".to_string(),
                    exit: Exit::Notify(Notification::new(
                        "Answered",
                        move |_: &Bell, who: String| {
                            if misfile {
                                Bell::Misfiled
                            } else {
                                Bell::Answered(who)
                            }
                        },
                    )),
                    recovery: Vec::new(),
                }),
                Behaviour::terminal("Answered", "Answered"),
                Behaviour::terminal("Misfiled", "Misfiled"),
            ],
        )
        .unwrap();

        StateMachine::new(registry, Vec::new(), "Waiting", Bell::Waiting { eager }).unwrap()
    }
}

mod revisiting {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Tick {
        Idle(u32),
        Work(u32),
        /// Rings its own notification, then fails with a recoverable error
        Restless,
        Rested,
    }

    impl State for Tick {
        type Context = Vec<String>;
        type Error = JobKind;
        type Trigger = ();

        fn name(&self) -> &str {
            match self {
                Self::Idle(_) => "Idle",
                Self::Work(_) => "Work",
                Self::Restless => "Restless",
                Self::Rested => "Rested",
            }
        }

        fn enter(&self, log: &mut Vec<String>, notifier: &Notifier<Self>) -> Result<(), JobKind> {
            log.push(self.name().to_string());
            if let Self::Restless = self {
                notifier.notify(()).map_err(|_| JobKind::Fatal)?;
                return Err(JobKind::Timeout);
            }
            Ok(())
        }
    }

    /// Idle waits for a notification into Work, Work continues back into
    /// Idle with the counter bumped.
    pub fn machine(initial: Tick) -> StateMachine<Tick> {
        let registry = BehaviourRegistry::new(
            JobKind::hierarchy(),
            vec![
                Behaviour::new(BehaviourConfig {
                    name: "Idle".to_string(),
                    state: "Idle".to_string(),
                    exit: Exit::Notify(Notification::new("Work", |tick: &Tick, _: ()| {
                        match tick {
                            Tick::Idle(n) => Tick::Work(*n),
                            other => other.clone(),
                        }
                    })),
                    recovery: Vec::new(),
                }),
                Behaviour::new(BehaviourConfig {
                    name: "Work".to_string(),
                    state: "Work".to_string(),
                    exit: Exit::Continue(Continuation::new("Idle", |tick: &Tick| match tick {
                        Tick::Work(n) => Tick::Idle(n + 1),
                        other => other.clone(),
                    })),
                    recovery: Vec::new(),
                }),
                Behaviour::new(BehaviourConfig {
                    name: "Restless".to_string(),
                    state: "Restless".to_string(),
                    exit: Exit::Notify(Notification::new("Work", |_: &Tick, _: ()| Tick::Work(0))),
                    recovery: vec![Recovery::new("Rested", JobKind::Io, |_: &Tick, _: &JobKind| {
                        Tick::Rested
                    })],
                }),
                Behaviour::terminal("Rested", "Rested"),
            ],
        )
        .unwrap();

        let behaviour = initial.name().to_string();
        StateMachine::new(registry, Vec::new(), &behaviour, initial).unwrap()
    }
}

#[test]
fn worker_and_print_alternate_until_done() {
    let mut machine = counting::machine(10);

    let outcome = machine.run().unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Completed {
            behaviour: "Done".to_string(),
            steps: 21
        }
    );
    assert_eq!(activations(machine.context(), "Worker"), 10);
    assert_eq!(activations(machine.context(), "Print"), 10);
    assert_eq!(activations(machine.context(), "Done"), 1);
}

#[test]
fn history_follows_the_run() {
    let mut machine = counting::machine(2);
    machine.run().unwrap();

    let history = machine.history();

    assert_eq!(
        history.get_path(),
        vec!["Worker", "Print", "Worker", "Print", "Done"]
    );
    assert_eq!(history.entries_into("Worker"), 2);
    assert!(history.records()[1..]
        .iter()
        .all(|r| r.via == Some(NavigatorKind::Continuation)));
    assert!(history.duration().is_some());
}

#[test]
fn descendant_error_takes_the_ancestor_recovery() {
    let mut machine = fetching::machine(Some(JobKind::Timeout));

    let outcome = machine.run().unwrap();

    assert_eq!(outcome.behaviour(), "Stored");
    assert_eq!(activations(machine.context(), "Request"), 2);
    assert_eq!(activations(machine.context(), "Backoff"), 1);
    assert_eq!(
        machine.history().get_path(),
        vec!["Request", "Backoff", "Request", "Stored"]
    );
}

#[test]
fn later_recovery_catches_what_earlier_ones_miss() {
    let mut machine = fetching::machine(Some(JobKind::Invalid));

    let outcome = machine.run().unwrap();

    assert_eq!(outcome.behaviour(), "Rejected");
    assert_eq!(activations(machine.context(), "Backoff"), 0);
}

#[test]
fn unrecovered_error_reaches_the_caller_verbatim() {
    let mut machine = fetching::machine(Some(JobKind::Fatal));

    let err = machine.run().unwrap_err();

    assert!(matches!(err, RunError::Unrecovered(JobKind::Fatal)));
    assert_eq!(machine.current_behaviour(), "Request");
    assert_eq!(machine.history().len(), 1);
}

#[test]
fn rerunning_a_frozen_machine_repeats_the_failing_step() {
    let mut machine = fetching::machine(Some(JobKind::Fatal));

    machine.run().unwrap_err();
    machine.run().unwrap_err();

    assert_eq!(activations(machine.context(), "Request"), 2);
}

#[test]
fn caller_repositions_a_frozen_machine() {
    let mut machine = fetching::machine(Some(JobKind::Fatal));
    machine.run().unwrap_err();

    machine
        .switch("Request", fetching::Fetch::Request { fail_with: None })
        .unwrap();
    assert_eq!(machine.history().records().last().unwrap().via, None);

    assert_eq!(machine.run().unwrap().behaviour(), "Stored");
}

#[test]
fn notification_resumes_an_awaiting_run() {
    let mut machine = ringing::machine(false, false);

    let first = machine.run().unwrap();
    assert_eq!(
        first,
        RunOutcome::Awaiting {
            behaviour: "Waiting".to_string(),
            steps: 1
        }
    );

    let delivery = machine.notifier().unwrap().notify("Ada".to_string()).unwrap();
    assert_eq!(delivery, Delivery::Delivered);
    assert_eq!(
        machine.current_state(),
        ringing::Bell::Answered("Ada".to_string())
    );

    let second = machine.run().unwrap();
    assert_eq!(second.behaviour(), "Answered");
    assert_eq!(machine.context(), &vec!["Waiting", "Answered"]);
}

#[test]
fn notification_from_the_entry_action_switches_immediately() {
    let mut machine = ringing::machine(true, false);

    let outcome = machine.run().unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Completed {
            behaviour: "Answered".to_string(),
            steps: 2
        }
    );
    assert_eq!(
        machine.history().records()[1].via,
        Some(NavigatorKind::Notification)
    );
}

#[test]
fn misdirected_notification_surfaces_as_structural_error() {
    let mut machine = ringing::machine(true, true);

    let err = machine.run().unwrap_err();

    assert!(matches!(
        err,
        RunError::Switch(SwitchError::Structural(StructuralError::StateMismatch { .. }))
    ));
    assert_eq!(machine.current_behaviour(), "Waiting");
}

#[test]
fn cancellation_stops_between_steps() {
    let mut machine = counting::machine(10);
    let stop = AtomicBool::new(false);
    let mut steps = 0;

    let err = machine
        .run_until(|| {
            steps += 1;
            if steps == 5 {
                stop.store(true, Ordering::SeqCst);
            }
            stop.load(Ordering::SeqCst)
        })
        .unwrap_err();

    assert!(matches!(err, RunError::Cancelled { .. }));
    assert_eq!(activations(machine.context(), "Worker"), 2);
    assert_eq!(activations(machine.context(), "Print"), 2);
}

#[test]
fn invalid_tables_report_every_problem() {
    let result = BehaviourRegistry::<ringing::Bell>::new(
        JobKind::hierarchy(),
        vec![
            Behaviour::new(BehaviourConfig {
                name: "Waiting".to_string(),
                state: "Waiting".to_string(),
                exit: Exit::Notify(Notification::new("Nobody", |_: &ringing::Bell, _: String| {
                    ringing::Bell::Misfiled
                })),
                recovery: vec![Recovery::new(
                    "Nowhere",
                    JobKind::Any,
                    |_: &ringing::Bell, _: &JobKind| ringing::Bell::Misfiled,
                )],
            }),
            Behaviour::terminal("Misfiled", "Misfiled"),
            Behaviour::terminal("Misfiled", "Misfiled"),
        ],
    );

    let Err(BuildError::Invalid(errors)) = result else {
        panic!("Expected an invalid registry");
    };
    assert_eq!(errors.len(), 3);
    assert!(errors.contains(&StructuralError::DuplicateBehaviour(
        "Misfiled".to_string()
    )));
}

#[tokio::test]
async fn notification_from_another_thread() {
    let mut machine = ringing::machine(false, false);
    machine.run().unwrap();

    let notifier = machine.notifier().unwrap();
    let rung = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&rung);

    let delivery = tokio::task::spawn_blocking(move || {
        flag.store(true, Ordering::SeqCst);
        notifier.notify("courier".to_string())
    })
    .await
    .unwrap()
    .unwrap();

    assert!(rung.load(Ordering::SeqCst));
    assert_eq!(delivery, Delivery::Delivered);

    let outcome = machine.run().unwrap();
    assert_eq!(outcome.behaviour(), "Answered");
    assert_eq!(
        machine.current_state(),
        ringing::Bell::Answered("courier".to_string())
    );
}

#[test]
fn notifier_from_an_earlier_visit_is_dropped() {
    use revisiting::Tick;

    let mut machine = revisiting::machine(Tick::Idle(0));
    assert!(matches!(machine.run().unwrap(), RunOutcome::Awaiting { .. }));

    let first = machine.notifier().unwrap();
    assert_eq!(first.notify(()).unwrap(), Delivery::Delivered);

    let outcome = machine.run().unwrap();
    assert_eq!(outcome.behaviour(), "Idle");
    assert_eq!(machine.current_state(), Tick::Idle(1));

    assert_eq!(first.notify(()).unwrap(), Delivery::Dropped);
    assert_eq!(machine.current_state(), Tick::Idle(1));

    let current = machine.notifier().unwrap();
    assert_eq!(current.notify(()).unwrap(), Delivery::Delivered);
    assert_eq!(machine.current_state(), Tick::Work(1));
}

#[test]
fn notification_from_the_entry_action_wins_over_recovery() {
    use revisiting::Tick;

    let mut machine = revisiting::machine(Tick::Restless);

    let outcome = machine.run().unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Awaiting {
            behaviour: "Idle".to_string(),
            steps: 3
        }
    );
    assert_eq!(machine.context(), &vec!["Restless", "Work", "Idle"]);
    let history = machine.history();
    assert_eq!(history.entries_into("Rested"), 0);
    assert_eq!(
        history.records()[1].via,
        Some(NavigatorKind::Notification)
    );
}

#[test]
fn failed_notification_between_runs_stays_with_the_signaller() {
    let mut machine = ringing::machine(false, true);
    machine.run().unwrap();

    let err = machine
        .notifier()
        .unwrap()
        .notify("Ada".to_string())
        .unwrap_err();
    assert!(matches!(err, StructuralError::StateMismatch { .. }));

    let outcome = machine.run().unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Awaiting {
            behaviour: "Waiting".to_string(),
            steps: 1
        }
    );
    assert_eq!(machine.context(), &vec!["Waiting", "Waiting"]);
}

#[test]
fn stale_misfiled_notification_is_dropped_unchecked() {
    let mut machine = ringing::machine(false, true);
    machine.run().unwrap();
    let stale = machine.notifier().unwrap();

    machine
        .switch("Waiting", ringing::Bell::Waiting { eager: false })
        .unwrap();

    assert_eq!(stale.notify("Ada".to_string()).unwrap(), Delivery::Dropped);
    assert_eq!(machine.run().unwrap().behaviour(), "Waiting");
}
