//! Macros for declaring error kinds.

/// Declare a fieldless error-kind enum together with its hierarchy.
///
/// Each variant may list its direct ancestors after a colon. The macro
/// derives the traits every kind needs, implements
/// [`Kinded`](crate::core::Kinded) so the enum can be used directly as a
/// state's error type, and generates `hierarchy()` returning the declared
/// [`KindHierarchy`](crate::core::KindHierarchy).
///
/// # Example
///
/// ```
/// use waypoint::error_kinds;
///
/// error_kinds! {
///     pub enum FetchKind {
///         Io,
///         Timeout: [Io],
///         Refused: [Io],
///         Parse,
///     }
/// }
///
/// let hierarchy = FetchKind::hierarchy();
/// assert!(hierarchy.matches(&FetchKind::Timeout, &FetchKind::Io));
/// assert!(!hierarchy.matches(&FetchKind::Parse, &FetchKind::Io));
/// assert_eq!(FetchKind::Refused.name(), "Refused");
/// ```
#[macro_export]
macro_rules! error_kinds {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(: [$($parent:ident),* $(,)?])?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        #[allow(dead_code)]
        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            pub fn hierarchy() -> $crate::core::KindHierarchy<Self> {
                let mut hierarchy = $crate::core::KindHierarchy::new();
                $(
                    let parents: ::std::vec::Vec<Self> = ::std::vec![$($(Self::$parent),*)?];
                    hierarchy.declare(Self::$variant, parents);
                )*
                hierarchy
            }
        }

        impl $crate::core::Kinded for $name {
            type Kind = Self;

            fn kind(&self) -> Self {
                *self
            }
        }
    };
}
