//! Chart documents.
//!
//! A [`Document`] is the immutable, validated form of a chart. It is built
//! once from nested declarations and then shared by every interpreter that
//! runs it. States, transitions and invocations live in flat arenas and
//! refer to each other by index, so parent links and ancestor lists need no
//! reference counting.
//!
//! # Example
//!
//! ```rust
//! use statecraft::document::{final_state, initial, state, transition, Datamodel, Document};
//! use statecraft::nodes;
//!
//! struct Orders;
//!
//! impl Datamodel for Orders {
//!     type Context = ();
//!     type Content = &'static str;
//!     type Source = ();
//! }
//!
//! let document = Document::<Orders>::build(nodes![
//!     initial("draft", nodes![transition(["submit"]).to(["review"]).action("notify")]),
//!     state("review", nodes![transition(["approve"]).to(["done"])]),
//!     final_state("done", nodes![]),
//! ])
//! .unwrap();
//!
//! let review = document.lookup("review").unwrap();
//! assert_eq!(document.state(review).id(), "review");
//! ```

mod builder;
mod compile;
mod error;
mod macros;
mod node;

pub use builder::{
    deep_history, done_data, eventless, final_state, history, initial, initial_transition,
    invoke, on_entry, on_exit, parallel, state, transition, InvokeDecl, Node, StateDecl,
    TransitionDecl,
};
pub use error::{BuildError, SchemaError};
pub use node::{
    Child, HistoryDepth, Invocation, InvocationId, StateId, StateKind, StateNode, Transition,
    TransitionId, TransitionKind,
};

use compile::Compiler;
use std::collections::HashMap;
use std::fmt;

/// Id reserved for the implicit document root.
pub const ROOT_ID: &str = "$root";

pub(crate) const ROOT: StateId = StateId(0);

/// Types a chart is parameterised over.
///
/// The engine never looks inside these; it hands them back to the host.
pub trait Datamodel: 'static {
    /// Extended state that guards are evaluated against.
    type Context: 'static;
    /// Executable content attached to entry, exit and transitions.
    type Content: Send + Sync + 'static;
    /// Description of what an invocation should start.
    type Source: Send + Sync + 'static;
}

/// A validated chart.
pub struct Document<D: Datamodel> {
    pub(crate) states: Vec<StateNode<D>>,
    pub(crate) transitions: Vec<Transition<D>>,
    pub(crate) invocations: Vec<Invocation<D>>,
    pub(crate) index: HashMap<String, StateId>,
}

impl<D: Datamodel> Document<D> {
    /// Build and validate a document from its top-level states.
    ///
    /// Exactly one top-level state must be marked initial. All problems are
    /// reported together in [`BuildError::Invalid`].
    pub fn build<I>(nodes: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = Node<D>>,
    {
        Compiler::new().compile(nodes)
    }

    /// The implicit root wrapping the top-level states.
    pub fn root(&self) -> StateId {
        ROOT
    }

    pub fn state(&self, id: StateId) -> &StateNode<D> {
        &self.states[id.0]
    }

    pub fn transition(&self, id: TransitionId) -> &Transition<D> {
        &self.transitions[id.0]
    }

    pub fn invocation(&self, id: InvocationId) -> &Invocation<D> {
        &self.invocations[id.0]
    }

    /// Resolve a declared state id.
    pub fn lookup(&self, id: &str) -> Option<StateId> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&StateNode<D>> {
        self.lookup(id).map(|state| self.state(state))
    }

    /// The top-level state marked initial.
    pub fn initial_state(&self) -> StateId {
        self.state(ROOT)
            .initial
            .and_then(|transition| self.transition(transition).targets.first().copied())
            .unwrap_or(ROOT)
    }

    /// Declared states in document order, root excluded.
    pub fn states(&self) -> impl Iterator<Item = &StateNode<D>> {
        self.states.iter().skip(1)
    }

    /// Number of declared states, root excluded.
    pub fn len(&self) -> usize {
        self.states.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `state` lies strictly inside `ancestor`.
    pub fn is_descendant(&self, state: StateId, ancestor: StateId) -> bool {
        self.state(state).ancestors.contains(&ancestor)
    }

    /// Ancestors of `state` from its parent upwards, stopping before `stop`.
    ///
    /// Returns nothing when `stop` is `state` itself or lies inside it.
    pub fn proper_ancestors(&self, state: StateId, stop: Option<StateId>) -> Vec<StateId> {
        if let Some(stop) = stop {
            if stop == state || self.is_descendant(stop, state) {
                return Vec::new();
            }
        }
        self.state(state)
            .ancestors
            .iter()
            .rev()
            .take_while(|ancestor| Some(**ancestor) != stop)
            .copied()
            .collect()
    }
}

impl<D: Datamodel> fmt::Debug for Document<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field(
                "states",
                &self.states().map(StateNode::id).collect::<Vec<_>>(),
            )
            .field("transitions", &self.transitions.len())
            .field("invocations", &self.invocations.len())
            .finish()
    }
}
