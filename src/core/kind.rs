//! Error kinds and the declared hierarchy used to match them.
//!
//! Recovery in both the state machine and the retry loop is keyed on error
//! *kinds*: plain values (usually a fieldless enum) reported by an error
//! through [`Kinded`]. Which kinds count as descendants of which is not
//! derived from any type system; the caller supplies it as data in a
//! [`KindHierarchy`].

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Bound satisfied by every usable error kind.
pub trait ErrorKind: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> ErrorKind for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// An error that can report which kind it belongs to.
pub trait Kinded {
    type Kind: ErrorKind;

    fn kind(&self) -> Self::Kind;
}

/// Caller-supplied ancestry of error kinds.
///
/// Each entry maps a kind to its ancestors. Ancestry is followed
/// transitively, so declaring `Timeout -> [Io]` and `Io -> [Any]` makes
/// `Any` an ancestor of `Timeout`. Cycles in the declared data are
/// tolerated and simply stop the walk.
///
/// # Example
///
/// ```rust
/// use waypoint::core::KindHierarchy;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Kind { Io, Timeout, Parse }
///
/// let hierarchy: KindHierarchy<Kind> = [(Kind::Timeout, vec![Kind::Io])].into_iter().collect();
///
/// assert!(hierarchy.matches(&Kind::Timeout, &Kind::Timeout));
/// assert!(hierarchy.matches(&Kind::Timeout, &Kind::Io));
/// assert!(!hierarchy.matches(&Kind::Io, &Kind::Timeout));
/// assert!(!hierarchy.matches(&Kind::Parse, &Kind::Io));
/// ```
#[derive(Clone, Debug)]
pub struct KindHierarchy<K: ErrorKind> {
    ancestors: HashMap<K, Vec<K>>,
}

impl<K: ErrorKind> Default for KindHierarchy<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ErrorKind> KindHierarchy<K> {
    /// A hierarchy in which every kind only matches itself.
    pub fn new() -> Self {
        Self {
            ancestors: HashMap::new(),
        }
    }

    /// Declare the direct ancestors of `kind`, appending to any earlier
    /// declaration for the same kind.
    pub fn declare(&mut self, kind: K, ancestors: Vec<K>) {
        self.ancestors.entry(kind).or_default().extend(ancestors);
    }

    /// Directly declared ancestors of `kind`.
    pub fn parents(&self, kind: &K) -> &[K] {
        self.ancestors.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if `ancestor` is reachable from `kind` through declared ancestry.
    pub fn is_ancestor(&self, ancestor: &K, kind: &K) -> bool {
        let mut seen = HashSet::new();
        let mut pending: Vec<&K> = self.parents(kind).iter().collect();

        while let Some(next) = pending.pop() {
            if next == ancestor {
                return true;
            }
            if seen.insert(next) {
                pending.extend(self.parents(next));
            }
        }
        false
    }

    /// Whether an error of kind `thrown` is handled by an entry registered
    /// for `handled`.
    pub fn matches(&self, thrown: &K, handled: &K) -> bool {
        thrown == handled || self.is_ancestor(handled, thrown)
    }

    /// Index of the first entry in `handled` that matches `thrown`.
    ///
    /// Registration order is the only ranking: an earlier entry registered
    /// for a distant ancestor beats a later one registered for the exact
    /// kind.
    pub fn first_match<'a, I>(&self, thrown: &K, handled: I) -> Option<usize>
    where
        I: IntoIterator<Item = &'a K>,
    {
        handled
            .into_iter()
            .position(|candidate| self.matches(thrown, candidate))
    }
}

impl<K: ErrorKind> FromIterator<(K, Vec<K>)> for KindHierarchy<K> {
    fn from_iter<T: IntoIterator<Item = (K, Vec<K>)>>(iter: T) -> Self {
        let mut hierarchy = Self::new();
        for (kind, ancestors) in iter {
            hierarchy.declare(kind, ancestors);
        }
        hierarchy
    }
}
