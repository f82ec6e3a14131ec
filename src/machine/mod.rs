//! Execution: navigation channels and the state machine that drives them.

mod channel;
mod error;
#[allow(clippy::module_inception)]
mod machine;

pub use channel::{Delivery, Listener, ListenerId, NavigationChannel, Notifier};
pub use error::{RunError, SwitchError};
pub use machine::{RunOutcome, StateMachine};
