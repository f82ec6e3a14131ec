//! Waypoint: a behaviour-driven finite state machine
//!
//! A workflow is a sequence of immutable states. Each state type is bound to
//! a *behaviour*, the transition table that decides what comes next once the
//! state's entry action has run:
//!
//! - a **continuation** fires as soon as the entry action succeeds
//! - a **notification** fires when something signals the behaviour's channel
//! - a **recovery** fires when the entry action fails with a matching error
//!   kind, where matching follows a caller-declared kind hierarchy
//!
//! The [`StateMachine`](machine::StateMachine) steps through states until a
//! behaviour with nothing to follow completes, a notification is awaited, or
//! an error escapes every recovery navigator. The same kind matching powers
//! the single-job [`Repeater`](retry::Repeater).
//!
//! # Core Concepts
//!
//! - **State**: typed step of a workflow via the [`State`] trait
//! - **Behaviour**: exit navigator plus ordered recovery navigators
//! - **Registry**: validated table of behaviours and the kind hierarchy
//! - **History**: in-memory record of every switch
//!
//! # Example
//!
//! ```rust
//! use waypoint::behaviour::{Behaviour, BehaviourConfig, BehaviourRegistry, Continuation, Exit};
//! use waypoint::core::State;
//! use waypoint::machine::{Notifier, RunOutcome, StateMachine};
//! use waypoint::error_kinds;
//!
//! error_kinds! {
//!     enum CountKind { Overflow }
//! }
//!
//! #[derive(Clone, Debug)]
//! enum Count {
//!     Tick(u32),
//!     Done,
//! }
//!
//! impl State for Count {
//!     type Context = Vec<u32>;
//!     type Error = CountKind;
//!     type Trigger = ();
//!
//!     fn name(&self) -> &str {
//!         match self {
//!             Self::Tick(_) => "Tick",
//!             Self::Done => "Done",
//!         }
//!     }
//!
//!     fn enter(&self, seen: &mut Vec<u32>, _: &Notifier<Self>) -> Result<(), CountKind> {
//!         if let Self::Tick(n) = self {
//!             seen.push(*n);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let registry = BehaviourRegistry::new(
//!     CountKind::hierarchy(),
//!     vec![
//!         Behaviour::new(BehaviourConfig {
//!             name: "Tick".to_string(),
//!             state: "Tick".to_string(),
//!             exit: Exit::Continue(Continuation::new("Done", |_: &Count| Count::Done)),
//!             recovery: Vec::new(),
//!         }),
//!         Behaviour::terminal("Done", "Done"),
//!     ],
//! )?;
//!
//! let mut machine = StateMachine::new(registry, Vec::new(), "Tick", Count::Tick(7))?;
//! let outcome = machine.run()?;
//!
//! assert!(matches!(outcome, RunOutcome::Completed { steps: 2, .. }));
//! assert_eq!(machine.context(), &vec![7]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod behaviour;
pub mod core;
pub mod machine;
pub mod retry;

// Re-export commonly used types
pub use behaviour::{Behaviour, BehaviourConfig, BehaviourRegistry, Exit};
pub use core::{KindHierarchy, Kinded, State};
pub use machine::{RunError, RunOutcome, StateMachine};
pub use retry::{Catch, Repeater, RetryPolicy};
