//! The table of behaviours a machine can switch between.

use crate::behaviour::error::{BuildError, StructuralError};
use crate::behaviour::table::Behaviour;
use crate::core::{KindHierarchy, KindOf, State};
use std::collections::{HashMap, HashSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::warn;

type Check = Validation<(), NonEmptyVec<StructuralError>>;

/// Behaviours by name, plus the kind hierarchy their recovery navigators
/// are matched against.
///
/// The whole table is validated when it is built, so a machine never has to
/// discover a dangling navigator target halfway through a run.
pub struct BehaviourRegistry<S: State> {
    behaviours: HashMap<String, Behaviour<S>>,
    hierarchy: KindHierarchy<KindOf<S>>,
}

impl<S: State> BehaviourRegistry<S> {
    /// Validate and index `behaviours`.
    ///
    /// Every violation is reported at once rather than the first one found.
    pub fn new(
        hierarchy: KindHierarchy<KindOf<S>>,
        behaviours: Vec<Behaviour<S>>,
    ) -> Result<Self, BuildError> {
        if behaviours.is_empty() {
            return Err(BuildError::EmptyRegistry);
        }

        match validate(&behaviours) {
            Validation::Success(_) => {}
            Validation::Failure(errors) => {
                return Err(BuildError::Invalid(errors.iter().cloned().collect()));
            }
        }

        for behaviour in &behaviours {
            warn_shadowed_recovery(behaviour, &hierarchy);
        }

        let behaviours = behaviours
            .into_iter()
            .map(|b| (b.name().to_string(), b))
            .collect();

        Ok(Self {
            behaviours,
            hierarchy,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Behaviour<S>> {
        self.behaviours.get(name)
    }

    /// Like [`get`](Self::get), but reports a missing name as a structural
    /// error.
    pub fn resolve(&self, name: &str) -> Result<&Behaviour<S>, StructuralError> {
        self.get(name)
            .ok_or_else(|| StructuralError::UnknownBehaviour {
                name: name.to_string(),
            })
    }

    pub fn hierarchy(&self) -> &KindHierarchy<KindOf<S>> {
        &self.hierarchy
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.behaviours.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.behaviours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviours.is_empty()
    }
}

fn validate<S: State>(behaviours: &[Behaviour<S>]) -> Check {
    let mut checks: Vec<Check> = Vec::new();
    let mut names = HashSet::new();

    for behaviour in behaviours {
        checks.push(if names.insert(behaviour.name()) {
            Validation::success(())
        } else {
            Validation::fail(StructuralError::DuplicateBehaviour(
                behaviour.name().to_string(),
            ))
        });
    }

    for behaviour in behaviours {
        for nav in behaviour.navigators() {
            for target in nav.targets() {
                checks.push(if names.contains(target.as_str()) {
                    Validation::success(())
                } else {
                    Validation::fail(StructuralError::UnknownTarget {
                        behaviour: behaviour.name().to_string(),
                        kind: nav.kind(),
                        target: target.clone(),
                    })
                });
            }
        }
    }

    Validation::all_vec(checks).map(|_| ())
}

// A recovery entry is dead if an earlier one already catches its kind.
fn warn_shadowed_recovery<S: State>(
    behaviour: &Behaviour<S>,
    hierarchy: &KindHierarchy<KindOf<S>>,
) {
    let recovery = behaviour.recovery();
    for (index, later) in recovery.iter().enumerate().skip(1) {
        let earlier = &recovery[..index];
        let handled = earlier.iter().map(|r| r.handles());
        if let Some(shadow) = hierarchy.first_match(later.handles(), handled) {
            warn!(
                behaviour = behaviour.name(),
                kind = ?later.handles(),
                shadowed_by = ?earlier[shadow].handles(),
                "Recovery navigator can never fire"
            );
        }
    }
}
