//! Permission predicates for commands.
//!
//! A predicate returning `false` makes its command invisible to the caller:
//! the matcher moves on to the next candidate without saying anything.

use std::sync::Arc;

use super::Caller;

/// Decides whether a command applies to a caller.
pub type Predicate = Arc<dyn Fn(&Caller<'_>) -> bool + Send + Sync>;

/// Wrap a closure as a [`Predicate`].
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&Caller<'_>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Always allow.
pub fn anyone() -> Predicate {
    predicate(|_| true)
}

/// Allow only when every predicate allows.
pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let predicates: Vec<Predicate> = predicates.into_iter().collect();
    predicate(move |caller| predicates.iter().all(|p| p(caller)))
}

/// Allow when at least one predicate allows.
pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let predicates: Vec<Predicate> = predicates.into_iter().collect();
    predicate(move |caller| predicates.iter().any(|p| p(caller)))
}

/// Allow connections whose display name matches `name` (case-insensitive).
pub fn named(name: impl Into<String>) -> Predicate {
    let name = name.into();
    predicate(move |caller| caller.connection().name().eq_ignore_ascii_case(&name))
}
