//! Door Bell
//!
//! A behaviour that waits for an outside event. The machine suspends, a
//! thread rings the bell through a notifier, and the run resumes.
//!
//! Key concepts:
//! - Notification exits and `RunOutcome::Awaiting`
//! - Notifiers moved to another thread
//! - Recovery from a failing entry action
//!
//! Run with: cargo run --example door_bell

use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use waypoint::behaviour::{
    Behaviour, BehaviourConfig, BehaviourRegistry, Continuation, Exit, Notification, Recovery,
};
use waypoint::core::State;
use waypoint::error_kinds;
use waypoint::machine::{Notifier, RunOutcome, StateMachine};

error_kinds! {
    enum DoorKind {
        Hardware,
        Jammed: [Hardware],
    }
}

#[derive(Clone, Debug)]
enum Door {
    Idle,
    Open { visitor: String, attempt: u32 },
    Stuck { visitor: String, attempt: u32 },
    Closed,
}

impl State for Door {
    type Context = Vec<String>;
    type Error = DoorKind;
    type Trigger = String;

    fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Open { .. } => "Open",
            Self::Stuck { .. } => "Stuck",
            Self::Closed => "Closed",
        }
    }

    fn enter(&self, log: &mut Vec<String>, _: &Notifier<Self>) -> Result<(), DoorKind> {
        match self {
            Self::Open { attempt: 0, .. } => Err(DoorKind::Jammed),
            Self::Open { visitor, .. } => {
                log.push(format!("welcome, {visitor}"));
                Ok(())
            }
            Self::Stuck { visitor, .. } => {
                log.push(format!("door stuck, {visitor} waits"));
                Ok(())
            }
            Self::Idle | Self::Closed => Ok(()),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("waypoint=debug")),
        )
        .with_target(false)
        .init();

    let registry = BehaviourRegistry::new(
        DoorKind::hierarchy(),
        vec![
            Behaviour::new(BehaviourConfig {
                name: "Idle".to_string(),
                state: "Idle".to_string(),
                exit: Exit::Notify(Notification::new("Open", |_: &Door, visitor: String| {
                    Door::Open {
                        visitor,
                        attempt: 0,
                    }
                })),
                recovery: Vec::new(),
            }),
            Behaviour::new(BehaviourConfig {
                name: "Open".to_string(),
                state: "Open".to_string(),
                exit: Exit::Continue(Continuation::new("Closed", |_: &Door| Door::Closed)),
                recovery: vec![Recovery::new(
                    "Stuck",
                    DoorKind::Hardware,
                    |state: &Door, _: &DoorKind| match state {
                        Door::Open { visitor, attempt } => Door::Stuck {
                            visitor: visitor.clone(),
                            attempt: *attempt,
                        },
                        other => other.clone(),
                    },
                )],
            }),
            Behaviour::new(BehaviourConfig {
                name: "Stuck".to_string(),
                state: "Stuck".to_string(),
                exit: Exit::Continue(Continuation::new("Open", |state: &Door| match state {
                    Door::Stuck { visitor, attempt } => Door::Open {
                        visitor: visitor.clone(),
                        attempt: attempt + 1,
                    },
                    other => other.clone(),
                })),
                recovery: Vec::new(),
            }),
            Behaviour::terminal("Closed", "Closed"),
        ],
    )?;

    let mut machine = StateMachine::new(registry, Vec::new(), "Idle", Door::Idle)?;

    let outcome = machine.run()?;
    println!("{outcome:?}");

    if let RunOutcome::Awaiting { .. } = outcome {
        let bell = machine.notifier()?;
        let ringer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            bell.notify("Ada".to_string())
        });
        let delivery = ringer.join().map_err(|_| "ringer thread panicked")??;
        println!("bell: {delivery:?}");
    }

    let outcome = machine.run()?;
    println!("{outcome:?}");
    for line in machine.context() {
        println!("{line}");
    }
    println!("path: {:?}", machine.history().get_path());

    Ok(())
}
