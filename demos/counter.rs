//! Counter
//!
//! Two behaviours hand control back and forth until a counter runs out.
//!
//! Key concepts:
//! - Continuations, including one that branches on the state
//! - A terminal behaviour ending the run
//! - Reading the switch history afterwards
//!
//! Run with: cargo run --example counter

use tracing_subscriber::EnvFilter;
use waypoint::behaviour::{Behaviour, BehaviourConfig, BehaviourRegistry, Continuation, Exit};
use waypoint::core::State;
use waypoint::error_kinds;
use waypoint::machine::{Notifier, StateMachine};

const CYCLES: u32 = 10;

error_kinds! {
    enum CounterKind {
        Overflow,
    }
}

#[derive(Clone, Debug)]
enum Counter {
    Worker { cycle: u32 },
    Print { cycle: u32 },
    Done,
}

#[derive(Default)]
struct Tally {
    work: u32,
    prints: u32,
}

impl State for Counter {
    type Context = Tally;
    type Error = CounterKind;
    type Trigger = ();

    fn name(&self) -> &str {
        match self {
            Self::Worker { .. } => "Worker",
            Self::Print { .. } => "Print",
            Self::Done => "Done",
        }
    }

    fn enter(&self, tally: &mut Tally, _: &Notifier<Self>) -> Result<(), CounterKind> {
        match self {
            Self::Worker { .. } => {
                tally.work = tally.work.checked_add(1).ok_or(CounterKind::Overflow)?;
            }
            Self::Print { cycle } => {
                tally.prints += 1;
                println!("counter is {cycle}");
            }
            Self::Done => println!("counting done"),
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("waypoint=info")),
        )
        .with_target(false)
        .init();

    let registry = BehaviourRegistry::new(
        CounterKind::hierarchy(),
        vec![
            Behaviour::new(BehaviourConfig {
                name: "Worker".to_string(),
                state: "Worker".to_string(),
                exit: Exit::Continue(Continuation::new("Print", |state: &Counter| match state {
                    Counter::Worker { cycle } => Counter::Print { cycle: *cycle },
                    other => other.clone(),
                })),
                recovery: Vec::new(),
            }),
            Behaviour::new(BehaviourConfig {
                name: "Print".to_string(),
                state: "Print".to_string(),
                exit: Exit::Continue(Continuation::branching(
                    ["Worker", "Done"],
                    |state: &Counter| match state {
                        Counter::Print { cycle } if *cycle < CYCLES => {
                            ("Worker", Counter::Worker { cycle: cycle + 1 })
                        }
                        _ => ("Done", Counter::Done),
                    },
                )),
                recovery: Vec::new(),
            }),
            Behaviour::terminal("Done", "Done"),
        ],
    )?;

    let mut machine = StateMachine::new(
        registry,
        Tally::default(),
        "Worker",
        Counter::Worker { cycle: 1 },
    )?;
    let outcome = machine.run()?;

    let history = machine.history();
    println!(
        "{} steps: {} work, {} prints, {} switches into Done",
        outcome.steps(),
        machine.context().work,
        machine.context().prints,
        history.entries_into("Done"),
    );

    Ok(())
}
