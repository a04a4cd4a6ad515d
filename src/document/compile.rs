//! Build pass turning declarations into a validated arena.
//!
//! Document order is assigned depth-first in declaration order, with states,
//! transitions and invocations sharing one counter. Target ids are resolved
//! only after the whole tree is placed, so forward references are fine.
//! Every violation is collected before failing.

use super::builder::{DeclaredKind, InvokeDecl, Node, StateDecl, TransitionDecl};
use super::error::{BuildError, SchemaError};
use super::node::{
    Child, HistoryDepth, Invocation, InvocationId, StateId, StateKind, StateNode, Transition,
    TransitionId,
};
use super::{Datamodel, Document, ROOT, ROOT_ID};
use serde_json::Value;
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use uuid::Uuid;

type Check = Validation<(), NonEmptyVec<SchemaError>>;

pub(crate) struct Compiler<D: Datamodel> {
    states: Vec<StateNode<D>>,
    transitions: Vec<Transition<D>>,
    invocations: Vec<Invocation<D>>,
    index: HashMap<String, StateId>,
    next_order: usize,
    checks: Vec<Check>,
}

impl<D: Datamodel> Compiler<D> {
    pub(crate) fn new() -> Self {
        let root = StateNode {
            id: ROOT_ID.to_string(),
            kind: StateKind::Compound,
            history_depth: None,
            is_initial: false,
            document_order: 0,
            depth: 0,
            donedata: Value::Null,
            parent: None,
            children: Vec::new(),
            ancestors: Vec::new(),
            descendants: Vec::new(),
            child_states: Vec::new(),
            history_children: Vec::new(),
            transitions: Vec::new(),
            invocations: Vec::new(),
            on_entry: Vec::new(),
            on_exit: Vec::new(),
            initial: None,
        };
        Self {
            states: vec![root],
            transitions: Vec::new(),
            invocations: Vec::new(),
            index: HashMap::new(),
            next_order: 1,
            checks: Vec::new(),
        }
    }

    pub(crate) fn compile<I>(mut self, nodes: I) -> Result<Document<D>, BuildError>
    where
        I: IntoIterator<Item = Node<D>>,
    {
        for node in nodes {
            match node {
                Node::State(decl) => {
                    self.place_state(decl, ROOT);
                }
                _ => self.fail(SchemaError::UnexpectedTopLevelNode),
            }
        }
        self.finish_state(ROOT);

        self.resolve_targets();
        self.place_root_initial();
        self.complete_compound_states();
        self.check_history_states();

        let Compiler {
            states,
            transitions,
            invocations,
            index,
            checks,
            ..
        } = self;

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(Document {
                states,
                transitions,
                invocations,
                index,
            }),
            Validation::Failure(errors) => {
                Err(BuildError::Invalid(errors.iter().cloned().collect()))
            }
        }
    }

    fn check<F>(&mut self, holds: bool, error: F)
    where
        F: FnOnce() -> SchemaError,
    {
        let check = if holds {
            Validation::success(())
        } else {
            Validation::fail(error())
        };
        self.checks.push(check);
    }

    fn fail(&mut self, error: SchemaError) {
        self.checks.push(Validation::fail(error));
    }

    fn next_order(&mut self) -> usize {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    fn place_state(&mut self, decl: StateDecl<D>, parent: StateId) -> StateId {
        let StateDecl {
            id: name,
            kind: declared,
            is_initial,
            children,
        } = decl;

        let id = StateId(self.states.len());
        let document_order = self.next_order();
        let mut ancestors = self.states[parent.0].ancestors.clone();
        ancestors.push(parent);
        let depth = ancestors.len();

        self.check(name != ROOT_ID, || SchemaError::ReservedStateId { id: name.clone() });
        if self.index.contains_key(&name) {
            self.fail(SchemaError::DuplicateStateId { id: name.clone() });
        } else {
            self.index.insert(name.clone(), id);
        }
        self.check(!is_initial || parent == ROOT, || {
            SchemaError::NestedInitialState { id: name.clone() }
        });

        // atomic states are promoted to compound once their children are known
        let (kind, history_depth) = match declared {
            DeclaredKind::State => (StateKind::Atomic, None),
            DeclaredKind::Parallel => (StateKind::Parallel, None),
            DeclaredKind::Final => (StateKind::Final, None),
            DeclaredKind::ShallowHistory => (StateKind::History, Some(HistoryDepth::Shallow)),
            DeclaredKind::DeepHistory => (StateKind::History, Some(HistoryDepth::Deep)),
        };

        self.states.push(StateNode {
            id: name,
            kind,
            history_depth,
            is_initial,
            document_order,
            depth,
            donedata: Value::Null,
            parent: Some(parent),
            children: Vec::new(),
            ancestors,
            descendants: Vec::new(),
            child_states: Vec::new(),
            history_children: Vec::new(),
            transitions: Vec::new(),
            invocations: Vec::new(),
            on_entry: Vec::new(),
            on_exit: Vec::new(),
            initial: None,
        });
        self.states[parent.0].children.push(Child::State(id));

        for child in children {
            match child {
                Node::State(decl) => {
                    self.place_state(decl, id);
                }
                Node::Transition(decl) => {
                    let transition = self.place_transition(decl, id);
                    let node = &mut self.states[id.0];
                    node.transitions.push(transition);
                    node.children.push(Child::Transition(transition));
                }
                Node::Initial(decl) => {
                    let transition = self.place_transition(decl, id);
                    if self.states[id.0].initial.replace(transition).is_some() {
                        let name = self.states[id.0].id.clone();
                        self.fail(SchemaError::InvalidInitialTransition { id: name });
                    }
                }
                Node::Invoke(decl) => self.place_invocation(decl, id),
                Node::OnEntry(content) => self.states[id.0].on_entry.push(content),
                Node::OnExit(content) => self.states[id.0].on_exit.push(content),
                Node::DoneData(data) => self.states[id.0].donedata = data,
            }
        }

        self.finish_state(id);
        id
    }

    fn finish_state(&mut self, id: StateId) {
        let child_ids: Vec<StateId> = self.states[id.0]
            .children
            .iter()
            .filter_map(|child| match child {
                Child::State(state) => Some(*state),
                _ => None,
            })
            .collect();

        let mut descendants = Vec::new();
        let mut child_states = Vec::new();
        let mut history_children = Vec::new();
        for child in child_ids {
            descendants.push(child);
            descendants.extend_from_slice(&self.states[child.0].descendants);
            if self.states[child.0].kind == StateKind::History {
                history_children.push(child);
            } else {
                child_states.push(child);
            }
        }

        let node = &mut self.states[id.0];
        if node.kind == StateKind::Atomic && !child_states.is_empty() {
            node.kind = StateKind::Compound;
        }
        let final_with_children = node.kind == StateKind::Final && !descendants.is_empty();
        node.descendants = descendants;
        node.child_states = child_states;
        node.history_children = history_children;

        if final_with_children {
            let name = node.id.clone();
            self.fail(SchemaError::FinalWithChildren { id: name });
        }
    }

    fn place_transition(&mut self, decl: TransitionDecl<D>, source: StateId) -> TransitionId {
        let TransitionDecl {
            events,
            targets,
            guard,
            actions,
            internal,
        } = decl;

        let id = TransitionId(self.transitions.len());
        let document_order = self.next_order();
        self.transitions.push(Transition {
            source,
            event_patterns: events,
            guard,
            target_ids: targets,
            targets: Vec::new(),
            actions,
            internal,
            document_order,
            depth: self.states[source.0].depth,
        });
        id
    }

    fn place_invocation(&mut self, decl: InvokeDecl<D>, owner: StateId) {
        let InvokeDecl {
            id,
            source,
            autoforward,
            error_policy,
        } = decl;

        let owner_id = self.states[owner.0].id.clone();
        let invoke_id = id.unwrap_or_else(|| format!("{}.{}", owner_id, Uuid::new_v4().simple()));
        let duplicate = self.states[owner.0]
            .invocations
            .iter()
            .any(|existing| self.invocations[existing.0].id == invoke_id);
        if duplicate {
            self.fail(SchemaError::DuplicateInvokeId {
                state: owner_id,
                invoke_id: invoke_id.clone(),
            });
        }

        let invocation = InvocationId(self.invocations.len());
        let document_order = self.next_order();
        self.invocations.push(Invocation {
            id: invoke_id,
            owner,
            source,
            autoforward,
            error_policy,
            document_order,
            depth: self.states[owner.0].depth,
        });
        let node = &mut self.states[owner.0];
        node.invocations.push(invocation);
        node.children.push(Child::Invocation(invocation));
    }

    fn resolve_targets(&mut self) {
        for transition in &mut self.transitions {
            for target in &transition.target_ids {
                match self.index.get(target) {
                    Some(state) => transition.targets.push(*state),
                    None => self.checks.push(Validation::fail(SchemaError::UnresolvedTarget {
                        source_state: self.states[transition.source.0].id.clone(),
                        target: target.clone(),
                    })),
                }
            }
        }
    }

    fn synthesize_initial(&mut self, state: StateId, target: StateId) -> TransitionId {
        let id = TransitionId(self.transitions.len());
        let document_order = self.next_order();
        self.transitions.push(Transition {
            source: state,
            event_patterns: Vec::new(),
            guard: None,
            target_ids: vec![self.states[target.0].id.clone()],
            targets: vec![target],
            actions: Vec::new(),
            internal: false,
            document_order,
            depth: self.states[state.0].depth,
        });
        id
    }

    fn place_root_initial(&mut self) {
        let initial: Vec<StateId> = self.states[ROOT.0]
            .children
            .iter()
            .filter_map(|child| match child {
                Child::State(state) if self.states[state.0].is_initial => Some(*state),
                _ => None,
            })
            .collect();

        match initial.as_slice() {
            [] => self.fail(SchemaError::MissingInitialState),
            [state] => {
                let transition = self.synthesize_initial(ROOT, *state);
                self.states[ROOT.0].initial = Some(transition);
            }
            many => {
                let ids = many
                    .iter()
                    .map(|state| self.states[state.0].id.clone())
                    .collect();
                self.fail(SchemaError::MultipleInitialStates { ids });
            }
        }
    }

    fn complete_compound_states(&mut self) {
        for index in 1..self.states.len() {
            let state = StateId(index);
            let kind = self.states[index].kind;
            match (kind, self.states[index].initial) {
                (StateKind::Compound, None) => {
                    let first = self.states[index].child_states[0];
                    let transition = self.synthesize_initial(state, first);
                    self.states[index].initial = Some(transition);
                }
                (StateKind::Compound, Some(transition)) => {
                    let targets = &self.transitions[transition.0].targets;
                    let valid = !targets.is_empty()
                        && targets
                            .iter()
                            .all(|target| self.states[target.0].ancestors.contains(&state));
                    let name = self.states[index].id.clone();
                    self.check(valid, || SchemaError::InvalidInitialTransition { id: name });
                }
                (_, Some(_)) => {
                    let name = self.states[index].id.clone();
                    self.fail(SchemaError::InvalidInitialTransition { id: name });
                }
                _ => {}
            }
        }
    }

    fn check_history_states(&mut self) {
        for index in 1..self.states.len() {
            let node = &self.states[index];
            if node.kind != StateKind::History {
                continue;
            }
            let name = node.id.clone();
            let default_ok = node.transitions.len() == 1
                && !self.transitions[node.transitions[0].0].target_ids.is_empty();
            let placement_ok = node.descendants.is_empty()
                && node
                    .parent
                    .is_some_and(|parent| !self.states[parent.0].child_states.is_empty());

            self.check(default_ok, || SchemaError::InvalidHistoryDefault { id: name.clone() });
            self.check(placement_ok, || SchemaError::InvalidHistoryPlacement { id: name });
        }
    }
}
