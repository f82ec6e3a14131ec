//! Core State trait for state machine states.
//!
//! A state is an immutable value describing one step of a workflow. The
//! machine never mutates a state: every transition replaces it with a new
//! value produced by a navigator.

use crate::core::kind::Kinded;
use crate::machine::Notifier;
use std::fmt::Debug;

/// Shorthand for the error kind reported by a state's entry action.
pub type KindOf<S> = <<S as State>::Error as Kinded>::Kind;

/// Trait for state machine states.
///
/// `name` doubles as the state-type key: a behaviour declares which key it
/// accepts, and the machine refuses to install a state under a behaviour
/// that expects a different key.
///
/// # Associated Types
///
/// - `Context`: the mutable working memory shared by every state of a machine
/// - `Error`: what an entry action fails with; its kind drives recovery
/// - `Trigger`: payload carried by notifications raised through a [`Notifier`]
///
/// # Example
///
/// ```rust
/// use waypoint::core::State;
/// use waypoint::machine::Notifier;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Fault {
///     Empty,
/// }
///
/// impl waypoint::core::Kinded for Fault {
///     type Kind = Fault;
///     fn kind(&self) -> Fault {
///         *self
///     }
/// }
///
/// #[derive(Clone, Debug)]
/// enum Step {
///     Read { line: usize },
///     Done,
/// }
///
/// impl State for Step {
///     type Context = Vec<String>;
///     type Error = Fault;
///     type Trigger = ();
///
///     fn name(&self) -> &str {
///         match self {
///             Self::Read { .. } => "Read",
///             Self::Done => "Done",
///         }
///     }
///
///     fn enter(&self, lines: &mut Vec<String>, _: &Notifier<Self>) -> Result<(), Fault> {
///         match self {
///             Self::Read { line } if *line >= lines.len() => Err(Fault::Empty),
///             _ => Ok(()),
///         }
///     }
/// }
///
/// assert_eq!(Step::Read { line: 0 }.name(), "Read");
/// ```
pub trait State: Clone + Debug + Send + Sync + 'static {
    /// Working memory shared by all states of one machine.
    type Context;

    /// Error returned by a failing entry action.
    type Error: Kinded + Debug + Send + 'static;

    /// Payload of a notification.
    type Trigger: Send + 'static;

    /// State-type key, also used for display/logging.
    fn name(&self) -> &str;

    /// Entry action, run once each time the machine steps on this state.
    ///
    /// The notifier is bound to the behaviour that is active while the
    /// action runs. It may be cloned and handed to other threads; signals
    /// raised after the machine has moved on are dropped.
    fn enter(
        &self,
        context: &mut Self::Context,
        notifier: &Notifier<Self>,
    ) -> Result<(), Self::Error>;
}
