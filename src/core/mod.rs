//! Core state machine types.
//!
//! This module contains the pieces every other module builds on:
//! - States via the `State` trait
//! - Error kinds and their caller-declared hierarchy
//! - The non-blocking `Holder` used to serialize switches
//! - The in-memory switch history

mod history;
mod holder;
mod kind;
mod state;

pub use history::{SwitchHistory, SwitchRecord};
pub use holder::{HoldToken, Holder};
pub use kind::{ErrorKind, KindHierarchy, Kinded};
pub use state::{KindOf, State};
