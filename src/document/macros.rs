//! Macros for ergonomic chart construction.

/// Build a `Vec<Node<_>>` from any mix of declarations.
///
/// Each element is converted with `Node::from`, so states, transitions and
/// invocations can be listed side by side with `on_entry(..)` and friends.
///
/// # Example
///
/// ```
/// use statecraft::document::{initial, state, transition, Datamodel, Document};
/// use statecraft::nodes;
///
/// struct Plain;
///
/// impl Datamodel for Plain {
///     type Context = ();
///     type Content = ();
///     type Source = ();
/// }
///
/// let document = Document::<Plain>::build(nodes![
///     initial("idle", nodes![transition(["go"]).to(["busy"])]),
///     state("busy", nodes![]),
/// ])
/// .unwrap();
///
/// assert!(document.lookup("busy").is_some());
/// ```
#[macro_export]
macro_rules! nodes {
    ($($node:expr),* $(,)?) => {
        vec![$($crate::document::Node::from($node)),*]
    };
}
