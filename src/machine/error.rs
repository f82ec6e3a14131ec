//! Errors raised while switching and running.

use crate::behaviour::StructuralError;
use thiserror::Error;

/// Why a switch did not happen.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SwitchError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("Another switch is already in progress")]
    InProgress,
}

/// Why a run ended without reaching a terminal behaviour.
///
/// `Unrecovered` carries the entry action's error exactly as it was
/// returned. The machine keeps the state and behaviour it failed in, so the
/// caller can fix things up and call `run` again.
#[derive(Debug, Error)]
pub enum RunError<E> {
    #[error("Entry action failed with an unrecovered error: {0:?}")]
    Unrecovered(E),

    #[error(transparent)]
    Switch(#[from] SwitchError),

    #[error("Run cancelled before entering '{behaviour}'")]
    Cancelled { behaviour: String },
}

impl<E> RunError<E> {
    pub fn unrecovered(&self) -> Option<&E> {
        match self {
            Self::Unrecovered(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_unrecovered(self) -> Option<E> {
        match self {
            Self::Unrecovered(error) => Some(error),
            _ => None,
        }
    }
}

impl<E> From<StructuralError> for RunError<E> {
    fn from(error: StructuralError) -> Self {
        Self::Switch(SwitchError::Structural(error))
    }
}
