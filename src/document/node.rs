//! Arena nodes: states, transitions and invocations.

use super::Datamodel;
use crate::core::{name_matches, DocumentPosition, Event, Guard};
use crate::invoke::ErrorPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Index of a state in its document's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

/// Index of a transition in its document's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(pub(crate) usize);

/// Index of an invocation in its document's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Atomic,
    Compound,
    Parallel,
    Final,
    History,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryDepth {
    /// Restores the direct children active at exit.
    Shallow,
    /// Restores the atomic descendants active at exit.
    Deep,
}

/// `external` transitions exit their source, `internal` ones may not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    External,
    Internal,
}

/// A declared child of a state, in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Child {
    State(StateId),
    Transition(TransitionId),
    Invocation(InvocationId),
}

/// One state of a chart.
pub struct StateNode<D: Datamodel> {
    pub(crate) id: String,
    pub(crate) kind: StateKind,
    pub(crate) history_depth: Option<HistoryDepth>,
    pub(crate) is_initial: bool,
    pub(crate) document_order: usize,
    pub(crate) depth: usize,
    pub(crate) donedata: Value,
    pub(crate) parent: Option<StateId>,
    pub(crate) children: Vec<Child>,
    pub(crate) ancestors: Vec<StateId>,
    pub(crate) descendants: Vec<StateId>,
    pub(crate) child_states: Vec<StateId>,
    pub(crate) history_children: Vec<StateId>,
    pub(crate) transitions: Vec<TransitionId>,
    pub(crate) invocations: Vec<InvocationId>,
    pub(crate) on_entry: Vec<D::Content>,
    pub(crate) on_exit: Vec<D::Content>,
    pub(crate) initial: Option<TransitionId>,
}

impl<D: Datamodel> StateNode<D> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    /// `Some` only for history states.
    pub fn history_depth(&self) -> Option<HistoryDepth> {
        self.history_depth
    }

    /// Whether this is the document's starting state.
    pub fn is_initial(&self) -> bool {
        self.is_initial
    }

    pub fn donedata(&self) -> &Value {
        &self.donedata
    }

    /// `None` only for the document root.
    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Ancestors ordered from the document root down to the parent.
    pub fn ancestors(&self) -> &[StateId] {
        &self.ancestors
    }

    pub fn descendants(&self) -> &[StateId] {
        &self.descendants
    }

    /// Child states in declaration order, history states excluded.
    pub fn child_states(&self) -> &[StateId] {
        &self.child_states
    }

    pub fn history_children(&self) -> &[StateId] {
        &self.history_children
    }

    pub fn transitions(&self) -> &[TransitionId] {
        &self.transitions
    }

    pub fn invocations(&self) -> &[InvocationId] {
        &self.invocations
    }

    pub fn on_entry(&self) -> &[D::Content] {
        &self.on_entry
    }

    pub fn on_exit(&self) -> &[D::Content] {
        &self.on_exit
    }

    /// Default-entry transition of compound states and the document root.
    pub fn initial_transition(&self) -> Option<TransitionId> {
        self.initial
    }

    pub fn is_atomic(&self) -> bool {
        self.descendants.is_empty()
    }

    pub fn is_compound(&self) -> bool {
        self.kind == StateKind::Compound
    }

    pub fn is_parallel(&self) -> bool {
        self.kind == StateKind::Parallel
    }

    pub fn is_final(&self) -> bool {
        self.kind == StateKind::Final
    }

    pub fn is_history(&self) -> bool {
        self.kind == StateKind::History
    }
}

impl<D: Datamodel> DocumentPosition for StateNode<D> {
    fn position(&self) -> usize {
        self.document_order
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

/// An edge from a source state to zero or more targets.
pub struct Transition<D: Datamodel> {
    pub(crate) source: StateId,
    pub(crate) event_patterns: Vec<String>,
    pub(crate) guard: Option<Guard<D::Context>>,
    pub(crate) target_ids: Vec<String>,
    pub(crate) targets: Vec<StateId>,
    pub(crate) actions: Vec<D::Content>,
    pub(crate) internal: bool,
    pub(crate) document_order: usize,
    pub(crate) depth: usize,
}

impl<D: Datamodel> Transition<D> {
    pub fn source(&self) -> StateId {
        self.source
    }

    pub fn event_patterns(&self) -> &[String] {
        &self.event_patterns
    }

    pub fn target_ids(&self) -> &[String] {
        &self.target_ids
    }

    /// Targets resolved at build time, in declared order.
    pub fn targets(&self) -> &[StateId] {
        &self.targets
    }

    pub fn actions(&self) -> &[D::Content] {
        &self.actions
    }

    pub fn kind(&self) -> TransitionKind {
        if self.internal || self.targets.is_empty() {
            TransitionKind::Internal
        } else {
            TransitionKind::External
        }
    }

    pub fn is_eventless(&self) -> bool {
        self.event_patterns.is_empty()
    }

    /// Whether this transition is triggered by `event`, or is eventless when
    /// `event` is `None`. Guards are not consulted.
    pub fn is_triggered_by(&self, event: Option<&Event>) -> bool {
        match event {
            None => self.is_eventless(),
            Some(event) => self
                .event_patterns
                .iter()
                .any(|pattern| name_matches(pattern, &event.name)),
        }
    }

    /// Evaluate the guard, `true` when there is none.
    pub fn guard_allows(&self, context: &D::Context) -> bool {
        self.guard.as_ref().is_none_or(|g| g.check(context))
    }
}

impl<D: Datamodel> DocumentPosition for Transition<D> {
    fn position(&self) -> usize {
        self.document_order
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

/// A long-running effect started while its owning state is active.
pub struct Invocation<D: Datamodel> {
    pub(crate) id: String,
    pub(crate) owner: StateId,
    pub(crate) source: D::Source,
    pub(crate) autoforward: bool,
    pub(crate) error_policy: ErrorPolicy,
    pub(crate) document_order: usize,
    pub(crate) depth: usize,
}

impl<D: Datamodel> Invocation<D> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> StateId {
        self.owner
    }

    /// Opaque handle the host resolves to a running effect.
    pub fn source(&self) -> &D::Source {
        &self.source
    }

    /// Whether every external event is forwarded to this invocation.
    pub fn autoforward(&self) -> bool {
        self.autoforward
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }
}

impl<D: Datamodel> DocumentPosition for Invocation<D> {
    fn position(&self) -> usize {
        self.document_order
    }

    fn depth(&self) -> usize {
        self.depth
    }
}
