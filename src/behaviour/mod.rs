//! Behaviours, navigators and the registry that ties them together.
//!
//! A behaviour is the transition table for one state type. It holds:
//! - an [`Exit`]: terminal, an unconditional [`Continuation`], or a
//!   [`Notification`] waiting on the behaviour's channel
//! - an ordered list of [`Recovery`] navigators tried when the entry
//!   action fails
//!
//! Behaviours are described with a [`BehaviourConfig`] value and collected
//! into a [`BehaviourRegistry`], which validates the whole table up front.

pub mod error;
pub mod macros;
mod navigator;
mod registry;
mod table;

pub use error::{BuildError, StructuralError};
pub use navigator::{
    Continuation, NavigationRequest, Navigator, NavigatorKind, Notification, Recovery,
};
pub use registry::BehaviourRegistry;
pub use table::{Behaviour, BehaviourConfig, Exit, StepResult};
