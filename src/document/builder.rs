//! Declarations and factory functions for authoring charts.
//!
//! Declarations are plain nested values; nothing is resolved until
//! [`Document::build`](super::Document::build) walks them.

use super::Datamodel;
use crate::core::Guard;
use crate::invoke::ErrorPolicy;
use serde_json::Value;

/// Anything that may appear among a state's children.
pub enum Node<D: Datamodel> {
    State(StateDecl<D>),
    Transition(TransitionDecl<D>),
    Invoke(InvokeDecl<D>),
    /// Default-entry transition of the enclosing compound state.
    Initial(TransitionDecl<D>),
    OnEntry(D::Content),
    OnExit(D::Content),
    DoneData(Value),
}

impl<D: Datamodel> From<StateDecl<D>> for Node<D> {
    fn from(decl: StateDecl<D>) -> Self {
        Node::State(decl)
    }
}

impl<D: Datamodel> From<TransitionDecl<D>> for Node<D> {
    fn from(decl: TransitionDecl<D>) -> Self {
        Node::Transition(decl)
    }
}

impl<D: Datamodel> From<InvokeDecl<D>> for Node<D> {
    fn from(decl: InvokeDecl<D>) -> Self {
        Node::Invoke(decl)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeclaredKind {
    State,
    Parallel,
    Final,
    ShallowHistory,
    DeepHistory,
}

/// Declaration of a state and its children.
pub struct StateDecl<D: Datamodel> {
    pub(crate) id: String,
    pub(crate) kind: DeclaredKind,
    pub(crate) is_initial: bool,
    pub(crate) children: Vec<Node<D>>,
}

impl<D: Datamodel> StateDecl<D> {
    fn new<I>(id: impl Into<String>, kind: DeclaredKind, children: I) -> Self
    where
        I: IntoIterator<Item = Node<D>>,
    {
        Self {
            id: id.into(),
            kind,
            is_initial: false,
            children: children.into_iter().collect(),
        }
    }

    /// Mark this state as the document's starting state.
    pub fn initial(mut self) -> Self {
        self.is_initial = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Declaration of a transition, attached to the state it is a child of.
pub struct TransitionDecl<D: Datamodel> {
    pub(crate) events: Vec<String>,
    pub(crate) targets: Vec<String>,
    pub(crate) guard: Option<Guard<D::Context>>,
    pub(crate) actions: Vec<D::Content>,
    pub(crate) internal: bool,
}

impl<D: Datamodel> TransitionDecl<D> {
    /// Set the target state ids.
    pub fn to<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Only fire while `predicate` holds for the extended state.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&D::Context) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    pub fn guard(mut self, guard: Guard<D::Context>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Append one piece of executable content.
    pub fn action(mut self, content: D::Content) -> Self {
        self.actions.push(content);
        self
    }

    pub fn actions<I>(mut self, contents: I) -> Self
    where
        I: IntoIterator<Item = D::Content>,
    {
        self.actions.extend(contents);
        self
    }

    /// Do not exit a compound source when every target lies inside it.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }
}

/// Declaration of an invocation owned by the enclosing state.
pub struct InvokeDecl<D: Datamodel> {
    pub(crate) id: Option<String>,
    pub(crate) source: D::Source,
    pub(crate) autoforward: bool,
    pub(crate) error_policy: ErrorPolicy,
}

impl<D: Datamodel> InvokeDecl<D> {
    /// Give the invocation an explicit id instead of a generated one.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Forward every external event to the invocation.
    pub fn autoforward(mut self) -> Self {
        self.autoforward = true;
        self
    }

    /// Ask the host to restart the effect after up to `max_restarts` failures.
    pub fn restart_on_error(mut self, max_restarts: usize) -> Self {
        self.error_policy = ErrorPolicy::Restart { max_restarts };
        self
    }
}

pub fn state<D, I>(id: impl Into<String>, children: I) -> StateDecl<D>
where
    D: Datamodel,
    I: IntoIterator<Item = Node<D>>,
{
    StateDecl::new(id, DeclaredKind::State, children)
}

/// A state marked as the document's starting state.
pub fn initial<D, I>(id: impl Into<String>, children: I) -> StateDecl<D>
where
    D: Datamodel,
    I: IntoIterator<Item = Node<D>>,
{
    StateDecl::new(id, DeclaredKind::State, children).initial()
}

/// A state whose child regions are all active at once.
pub fn parallel<D, I>(id: impl Into<String>, children: I) -> StateDecl<D>
where
    D: Datamodel,
    I: IntoIterator<Item = Node<D>>,
{
    StateDecl::new(id, DeclaredKind::Parallel, children)
}

pub fn final_state<D, I>(id: impl Into<String>, children: I) -> StateDecl<D>
where
    D: Datamodel,
    I: IntoIterator<Item = Node<D>>,
{
    StateDecl::new(id, DeclaredKind::Final, children)
}

/// A shallow history pseudo-state. `children` must hold its default transition.
pub fn history<D, I>(id: impl Into<String>, children: I) -> StateDecl<D>
where
    D: Datamodel,
    I: IntoIterator<Item = Node<D>>,
{
    StateDecl::new(id, DeclaredKind::ShallowHistory, children)
}

/// A deep history pseudo-state. `children` must hold its default transition.
pub fn deep_history<D, I>(id: impl Into<String>, children: I) -> StateDecl<D>
where
    D: Datamodel,
    I: IntoIterator<Item = Node<D>>,
{
    StateDecl::new(id, DeclaredKind::DeepHistory, children)
}

/// A transition triggered by any of `events`.
pub fn transition<D, I, S>(events: I) -> TransitionDecl<D>
where
    D: Datamodel,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TransitionDecl {
        events: events.into_iter().map(Into::into).collect(),
        targets: Vec::new(),
        guard: None,
        actions: Vec::new(),
        internal: false,
    }
}

/// A transition taken as soon as its guard allows, without an event.
pub fn eventless<D: Datamodel>() -> TransitionDecl<D> {
    transition(Vec::<String>::new())
}

pub fn invoke<D: Datamodel>(source: D::Source) -> InvokeDecl<D> {
    InvokeDecl {
        id: None,
        source,
        autoforward: false,
        error_policy: ErrorPolicy::Propagate,
    }
}

pub fn on_entry<D: Datamodel>(content: D::Content) -> Node<D> {
    Node::OnEntry(content)
}

pub fn on_exit<D: Datamodel>(content: D::Content) -> Node<D> {
    Node::OnExit(content)
}

/// Payload carried by `done.state.*` events when this final state is entered.
pub fn done_data<D: Datamodel>(data: Value) -> Node<D> {
    Node::DoneData(data)
}

/// Override the default child of a compound state, optionally with actions.
pub fn initial_transition<D: Datamodel>(decl: TransitionDecl<D>) -> Node<D> {
    Node::Initial(decl)
}
