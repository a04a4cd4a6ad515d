//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions over the chart's extended state. A
//! transition whose guard rejects the current context is never selected.

use std::fmt;

/// Pure predicate over extended state that decides if a transition is enabled.
///
/// Guards are evaluated during transition selection, once per candidate, and
/// must not have side effects.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Guard;
///
/// struct Cart {
///     items: usize,
/// }
///
/// let has_items = Guard::new(|cart: &Cart| cart.items > 0);
///
/// assert!(has_items.check(&Cart { items: 2 }));
/// assert!(!has_items.check(&Cart { items: 0 }));
/// ```
pub struct Guard<C> {
    predicate: Box<dyn Fn(&C) -> bool + Send + Sync>,
}

impl<C> Guard<C> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Check if the guard allows a transition against this context.
    pub fn check(&self, context: &C) -> bool {
        (self.predicate)(context)
    }
}

impl<C> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}
