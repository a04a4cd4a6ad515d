//! Transition selection, conflict resolution and exit sets.

use super::{Host, Interpreter};
use crate::core::{document_order, Event, OrderedSet};
use crate::document::{Datamodel, StateId, TransitionId, TransitionKind};
use std::sync::Arc;
use tracing::debug;

impl<D: Datamodel, H: Host<D>> Interpreter<D, H> {
    /// Select the transitions enabled by `event`, or the eventless ones when
    /// `event` is `None`, with conflicts already removed.
    pub(super) fn select_transitions(&self, event: Option<&Event>) -> OrderedSet<TransitionId> {
        let document = &self.document;
        let context = self.host.context();

        let mut atomic: Vec<StateId> = self
            .configuration
            .iter()
            .copied()
            .filter(|state| document.state(*state).is_atomic())
            .collect();
        atomic.sort_by(|a, b| document_order(document.state(*a), document.state(*b)));

        let mut enabled = OrderedSet::new();
        for state in atomic {
            let lineage = std::iter::once(state).chain(document.proper_ancestors(state, None));
            'lineage: for candidate in lineage {
                let mut transitions = document.state(candidate).transitions.clone();
                transitions.sort_by(|a, b| {
                    document_order(document.transition(*a), document.transition(*b))
                });
                for id in transitions {
                    let transition = document.transition(id);
                    if transition.is_triggered_by(event) && transition.guard_allows(context) {
                        enabled.insert(id);
                        break 'lineage;
                    }
                }
            }
        }

        let enabled = self.remove_conflicting(&enabled);
        if !enabled.is_empty() {
            debug!(
                interpreter = %self.options.name,
                event = event.map(|e| e.name.as_str()).unwrap_or("<eventless>"),
                count = enabled.len(),
                "selected transitions"
            );
        }
        enabled
    }

    /// Drop transitions whose exit sets overlap, preferring deeper sources.
    fn remove_conflicting(&self, enabled: &OrderedSet<TransitionId>) -> OrderedSet<TransitionId> {
        let document = &self.document;
        let mut filtered: OrderedSet<TransitionId> = OrderedSet::new();

        for &t1 in enabled {
            let exit1 = self.compute_exit_set(&[t1]);
            let source1 = document.transition(t1).source;
            let mut preempted = false;
            let mut to_remove = Vec::new();

            for &t2 in &filtered {
                if !exit1.has_intersection(&self.compute_exit_set(&[t2])) {
                    continue;
                }
                if document.is_descendant(source1, document.transition(t2).source) {
                    to_remove.push(t2);
                } else {
                    preempted = true;
                    break;
                }
            }

            if !preempted {
                for t3 in &to_remove {
                    filtered.remove(t3);
                }
                filtered.insert(t1);
            }
        }
        filtered
    }

    /// Active states left by taking `transitions`.
    pub(super) fn compute_exit_set(&self, transitions: &[TransitionId]) -> OrderedSet<StateId> {
        let mut exit = OrderedSet::new();
        for &id in transitions {
            let Some(domain) = self.transition_domain(id) else {
                continue;
            };
            for &state in &self.configuration {
                if self.document.is_descendant(state, domain) {
                    exit.insert(state);
                }
            }
        }
        exit
    }

    /// The state whose descendants a transition exits and enters, `None` for
    /// targetless transitions.
    pub(super) fn transition_domain(&self, id: TransitionId) -> Option<StateId> {
        let document = &self.document;
        let transition = document.transition(id);
        let targets = self.effective_target_states(id);
        if targets.is_empty() {
            return None;
        }

        let source = transition.source;
        if transition.kind() == TransitionKind::Internal
            && document.state(source).is_compound()
            && targets.every(|target| document.is_descendant(*target, source))
        {
            return Some(source);
        }

        let mut states = vec![source];
        states.extend(targets.iter().copied());
        Some(self.find_lcca(&states))
    }

    /// Least common compound ancestor of `states`, the root at worst.
    fn find_lcca(&self, states: &[StateId]) -> StateId {
        let document = &self.document;
        let Some((head, tail)) = states.split_first() else {
            return document.root();
        };
        document
            .proper_ancestors(*head, None)
            .into_iter()
            .filter(|ancestor| document.state(*ancestor).is_compound())
            .find(|ancestor| tail.iter().all(|state| document.is_descendant(*state, *ancestor)))
            .unwrap_or_else(|| document.root())
    }

    /// Targets of a transition with history states replaced by what they
    /// currently stand for.
    pub(super) fn effective_target_states(&self, id: TransitionId) -> OrderedSet<StateId> {
        let document = Arc::clone(&self.document);
        let mut targets = OrderedSet::new();
        for &target in document.transition(id).targets() {
            let node = document.state(target);
            if !node.is_history() {
                targets.insert(target);
            } else if let Some(recorded) = self.history.get(&target) {
                targets.union(recorded.iter().copied());
            } else {
                for &default in node.transitions() {
                    targets.union(self.effective_target_states(default).iter().copied());
                }
            }
        }
        targets
    }
}
