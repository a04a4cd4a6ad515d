//! Exiting and entering states.

use super::{EngineError, HaltReason, Host, Interpreter, Status};
use crate::core::{document_order, entry_order, exit_order, Event, Microstep, OrderedSet};
use crate::document::{Datamodel, HistoryDepth, StateId, TransitionId};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// States a microstep will enter, plus the content owed to some of them.
#[derive(Default)]
struct EntrySet {
    states: OrderedSet<StateId>,
    /// Compound states entered through their initial transition.
    default_entry: OrderedSet<StateId>,
    /// Parent state -> default transition of an unrecorded history child.
    default_history: HashMap<StateId, TransitionId>,
}

impl<D: Datamodel, H: Host<D>> Interpreter<D, H> {
    pub(super) fn enter_initial(&mut self) -> Result<(), EngineError> {
        let root = self.document.root();
        let Some(initial) = self.document.state(root).initial_transition() else {
            return Ok(());
        };
        self.microstep(&[initial], None)
    }

    /// Take eventless transitions and internal events until neither is left.
    pub(super) fn run_microsteps(&mut self) -> Result<(), EngineError> {
        while self.running {
            let mut event = None;
            let mut enabled = self.select_transitions(None);
            if enabled.is_empty() {
                let Some(internal) = self.internal_queue.dequeue() else {
                    return Ok(());
                };
                enabled = self.select_transitions(Some(&internal));
                event = Some(internal);
            }
            if !enabled.is_empty() {
                self.microstep(&enabled.to_list(), event.as_ref())?;
            }
        }
        Ok(())
    }

    pub(super) fn microstep(
        &mut self,
        transitions: &[TransitionId],
        event: Option<&Event>,
    ) -> Result<(), EngineError> {
        let exited = self.exit_states(transitions, event)?;
        self.execute_transition_content(transitions, event)?;
        let entered = self.enter_states(transitions, event)?;

        debug!(
            interpreter = %self.options.name,
            event = event.map(|e| e.name.as_str()).unwrap_or("<eventless>"),
            exited = ?exited,
            entered = ?entered,
            "microstep"
        );
        if self.options.record_trace {
            self.trace.record(Microstep {
                event: event.map(|e| e.name.clone()),
                exited,
                entered,
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    fn execute_transition_content(
        &mut self,
        transitions: &[TransitionId],
        event: Option<&Event>,
    ) -> Result<(), EngineError> {
        let document = Arc::clone(&self.document);
        for &id in transitions {
            self.execute(document.transition(id).actions(), event)?;
        }
        Ok(())
    }

    fn exit_states(
        &mut self,
        transitions: &[TransitionId],
        event: Option<&Event>,
    ) -> Result<Vec<String>, EngineError> {
        let document = Arc::clone(&self.document);
        let exit_set = self.compute_exit_set(transitions);
        for state in &exit_set {
            self.states_to_invoke.remove(state);
        }

        let mut to_exit = exit_set.to_list();
        to_exit.sort_by(|a, b| exit_order(document.state(*a), document.state(*b)));

        for &state in &to_exit {
            for &history in document.state(state).history_children() {
                let deep = document.state(history).history_depth() == Some(HistoryDepth::Deep);
                let recorded = self
                    .configuration
                    .iter()
                    .copied()
                    .filter(|active| {
                        if deep {
                            document.state(*active).is_atomic()
                                && document.is_descendant(*active, state)
                        } else {
                            document.state(*active).parent() == Some(state)
                        }
                    })
                    .collect();
                self.history.insert(history, recorded);
            }
        }

        for &state in &to_exit {
            self.exit_state(state, event)?;
        }
        Ok(to_exit
            .iter()
            .map(|state| document.state(*state).id().to_string())
            .collect())
    }

    /// Run exit content, cancel started invocations and deactivate `state`.
    ///
    /// Invocations are cancelled and the state is left even when its exit
    /// content fails; the content error is returned afterwards.
    fn exit_state(&mut self, state: StateId, event: Option<&Event>) -> Result<(), EngineError> {
        let document = Arc::clone(&self.document);
        let node = document.state(state);
        let result = self.execute(node.on_exit(), event);
        for id in node.invocations() {
            if self.active_invocations.remove(id) {
                debug!(
                    interpreter = %self.options.name,
                    invoke_id = %document.invocation(*id).id(),
                    "cancelling invocation"
                );
                self.host.cancel_invoke(document.invocation(*id));
            }
        }
        self.configuration.remove(&state);
        result
    }

    fn enter_states(
        &mut self,
        transitions: &[TransitionId],
        event: Option<&Event>,
    ) -> Result<Vec<String>, EngineError> {
        let document = Arc::clone(&self.document);
        let mut entry = EntrySet::default();
        self.compute_entry_set(transitions, &mut entry);

        let mut to_enter = entry.states.to_list();
        to_enter.sort_by(|a, b| entry_order(document.state(*a), document.state(*b)));

        for &state in &to_enter {
            let node = document.state(state);
            self.configuration.insert(state);
            self.states_to_invoke.insert(state);
            self.execute(node.on_entry(), event)?;

            if entry.default_entry.contains(&state) {
                if let Some(initial) = node.initial_transition() {
                    self.execute(document.transition(initial).actions(), event)?;
                }
            }
            if let Some(default) = entry.default_history.get(&state) {
                self.execute(document.transition(*default).actions(), event)?;
            }
            if node.is_final() {
                self.complete_final(state);
            }
        }
        Ok(to_enter
            .iter()
            .map(|state| document.state(*state).id().to_string())
            .collect())
    }

    /// Raise the done events owed for entering the final state `state`.
    fn complete_final(&mut self, state: StateId) {
        let document = Arc::clone(&self.document);
        let Some(parent) = document.state(state).parent() else {
            return;
        };
        if parent == document.root() {
            self.stop(HaltReason::Completed);
            return;
        }

        self.internal_queue.enqueue(
            Event::internal(format!("done.state.{}", document.state(parent).id()))
                .with_data(document.state(state).donedata().clone()),
        );

        if let Some(grandparent) = document.state(parent).parent() {
            let node = document.state(grandparent);
            if node.is_parallel()
                && node
                    .child_states()
                    .iter()
                    .all(|region| self.is_in_final_state(*region))
            {
                self.internal_queue
                    .enqueue(Event::internal(format!("done.state.{}", node.id())));
            }
        }
    }

    fn is_in_final_state(&self, state: StateId) -> bool {
        let node = self.document.state(state);
        if node.is_compound() {
            node.child_states().iter().any(|child| {
                self.document.state(*child).is_final() && self.configuration.contains(child)
            })
        } else if node.is_parallel() {
            node.child_states()
                .iter()
                .all(|child| self.is_in_final_state(*child))
        } else {
            false
        }
    }

    fn compute_entry_set(&self, transitions: &[TransitionId], entry: &mut EntrySet) {
        for &id in transitions {
            for &target in self.document.transition(id).targets() {
                self.add_descendant_states(target, entry);
            }
            let domain = self.transition_domain(id);
            for &target in &self.effective_target_states(id) {
                self.add_ancestor_states(target, domain, entry);
            }
        }
    }

    fn add_descendant_states(&self, state: StateId, entry: &mut EntrySet) {
        let document = &self.document;
        let node = document.state(state);

        if node.is_history() {
            let parent = node.parent();
            if let Some(recorded) = self.history.get(&state) {
                for &restored in recorded {
                    self.add_descendant_states(restored, entry);
                }
                for &restored in recorded {
                    self.add_ancestor_states(restored, parent, entry);
                }
            } else if let Some(&default) = node.transitions().first() {
                if let Some(parent) = parent {
                    entry.default_history.insert(parent, default);
                }
                for &target in document.transition(default).targets() {
                    self.add_descendant_states(target, entry);
                }
                for &target in document.transition(default).targets() {
                    self.add_ancestor_states(target, parent, entry);
                }
            }
            return;
        }

        entry.states.insert(state);
        if node.is_compound() {
            entry.default_entry.insert(state);
            if let Some(initial) = node.initial_transition() {
                for &target in document.transition(initial).targets() {
                    self.add_descendant_states(target, entry);
                }
                for &target in document.transition(initial).targets() {
                    self.add_ancestor_states(target, Some(state), entry);
                }
            }
        } else if node.is_parallel() {
            self.add_uncovered_regions(state, entry);
        }
    }

    /// Add the ancestors of `state` strictly below `stop`.
    fn add_ancestor_states(&self, state: StateId, stop: Option<StateId>, entry: &mut EntrySet) {
        let stop = stop.unwrap_or_else(|| self.document.root());
        for ancestor in self.document.proper_ancestors(state, Some(stop)) {
            entry.states.insert(ancestor);
            if self.document.state(ancestor).is_parallel() {
                self.add_uncovered_regions(ancestor, entry);
            }
        }
    }

    fn add_uncovered_regions(&self, parallel: StateId, entry: &mut EntrySet) {
        for &region in self.document.state(parallel).child_states() {
            let covered = entry
                .states
                .some(|state| *state == region || self.document.is_descendant(*state, region));
            if !covered {
                self.add_descendant_states(region, entry);
            }
        }
    }

    /// Start invocations of states entered since the last stable point.
    pub(super) fn start_invocations(&mut self) -> Result<(), EngineError> {
        let document = Arc::clone(&self.document);
        let mut states = self.states_to_invoke.to_list();
        states.sort_by(|a, b| entry_order(document.state(*a), document.state(*b)));
        self.states_to_invoke.clear();

        let sender = self.sender();
        for state in states {
            let mut invocations = document.state(state).invocations().to_vec();
            invocations.sort_by(|a, b| {
                document_order(document.invocation(*a), document.invocation(*b))
            });
            for id in invocations {
                if self.active_invocations.contains(&id) {
                    continue;
                }
                let invocation = document.invocation(id);
                debug!(
                    interpreter = %self.options.name,
                    invoke_id = %invocation.id(),
                    "starting invocation"
                );
                match self.host.invoke(invocation, &sender) {
                    Ok(()) => {
                        self.active_invocations.insert(id);
                    }
                    Err(error) => {
                        warn!(
                            interpreter = %self.options.name,
                            invoke_id = %invocation.id(),
                            %error,
                            "invocation failed to start"
                        );
                        self.internal_queue.enqueue(
                            Event::internal(format!("error.invoke.{}", invocation.id()))
                                .with_invoke_id(invocation.id())
                                .with_data(json!({ "message": error.to_string() })),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Exit whatever is still active and report completion.
    ///
    /// Every state is exited and every started invocation cancelled even if
    /// exit content fails. The first such failure is returned once the
    /// interpreter is stopped.
    pub(super) fn exit_interpreter(&mut self) -> Result<(), EngineError> {
        if self.status == Status::Stopped {
            return Ok(());
        }
        let document = Arc::clone(&self.document);

        let mut snapshot = self.configuration.to_list();
        snapshot.sort_by_key(|state| document.state(*state).document_order);
        self.final_configuration = snapshot
            .iter()
            .map(|state| document.state(*state).id().to_string())
            .collect();

        let mut to_exit = self.configuration.to_list();
        to_exit.sort_by(|a, b| exit_order(document.state(*a), document.state(*b)));
        let mut outcome = Ok(());
        for state in to_exit {
            if let Err(error) = self.exit_state(state, None) {
                warn!(
                    interpreter = %self.options.name,
                    state = %document.state(state).id(),
                    %error,
                    "exit content failed during shutdown"
                );
                if outcome.is_ok() {
                    outcome = Err(error);
                }
            }
            let node = document.state(state);
            if node.is_final() && node.parent() == Some(document.root()) {
                self.host.return_done_event(node.donedata());
                self.done_data = Some(node.donedata().clone());
                self.notify_parent(node.donedata().clone());
            }
        }

        self.states_to_invoke.clear();
        self.status = Status::Stopped;
        info!(
            interpreter = %self.options.name,
            reason = ?self.halt_reason,
            "interpreter halted"
        );
        outcome
    }

    fn notify_parent(&self, donedata: serde_json::Value) {
        let (Some(parent), Some(invoke_id)) = (&self.options.parent, &self.options.invoke_id)
        else {
            return;
        };
        parent.send(
            Event::new(format!("done.invoke.{invoke_id}"))
                .with_invoke_id(invoke_id.clone())
                .with_origin(self.options.name.clone())
                .with_data(donedata),
        );
    }
}
