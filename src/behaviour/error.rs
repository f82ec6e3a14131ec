//! Structural errors: mistakes in how behaviours are wired together.

use crate::behaviour::NavigatorKind;
use thiserror::Error;

/// A programming error in the behaviour table or in a navigator's output.
///
/// These are reported immediately and never retried or recovered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("Unknown behaviour '{name}'")]
    UnknownBehaviour { name: String },

    #[error("Behaviour '{behaviour}' expects state '{expected}', got '{found}'")]
    StateMismatch {
        behaviour: String,
        expected: String,
        found: String,
    },

    #[error("Behaviour '{0}' is registered more than once")]
    DuplicateBehaviour(String),

    #[error("The {kind} navigator of '{behaviour}' targets unknown behaviour '{target}'")]
    UnknownTarget {
        behaviour: String,
        kind: NavigatorKind,
        target: String,
    },
}

/// Errors that can occur when building a behaviour registry.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No behaviours defined. Register at least one behaviour")]
    EmptyRegistry,

    #[error("Behaviour registry is invalid: {}", summarize(.0))]
    Invalid(Vec<StructuralError>),
}

fn summarize(errors: &[StructuralError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
