//! The capability surface an interpreter drives.

use super::EventSender;
use crate::core::{Event, EventKind};
use crate::document::{Datamodel, Invocation};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Target that routes an event onto the interpreter's internal queue.
pub const INTERNAL_TARGET: &str = "_internal";

/// Target that routes an event to the parent interpreter.
pub const PARENT_TARGET: &str = "_parent";

/// Failure reported by a [`Host`] hook.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    #[error("Executable content failed: {message}")]
    Content { message: String },

    #[error("Invocation '{invoke_id}' could not be started: {message}")]
    Invoke { invoke_id: String, message: String },
}

impl HostError {
    pub fn content(message: impl Into<String>) -> Self {
        HostError::Content {
            message: message.into(),
        }
    }

    pub fn invoke(invoke_id: impl Into<String>, message: impl Into<String>) -> Self {
        HostError::Invoke {
            invoke_id: invoke_id.into(),
            message: message.into(),
        }
    }
}

/// Events produced by executable content, routed once the hook returns.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
/// use statecraft::interpreter::Outbox;
///
/// let mut outbox = Outbox::new();
/// outbox.raise(Event::new("checked"));
/// outbox.send_to(Event::new("ping"), "worker");
///
/// assert_eq!(outbox.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<(Event, Option<String>)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `event` on the interpreter's internal queue.
    pub fn raise(&mut self, event: Event) {
        self.messages.push((
            event.into_kind(EventKind::Internal),
            Some(INTERNAL_TARGET.to_string()),
        ));
    }

    /// Queue `event` on the interpreter's own external queue.
    pub fn send(&mut self, event: Event) {
        self.messages.push((event, None));
    }

    /// Send `event` to `_internal`, `_parent` or an active invocation id.
    pub fn send_to(&mut self, event: Event, target: impl Into<String>) {
        self.messages.push((event, Some(target.into())));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, (Event, Option<String>)> {
        self.messages.drain(..)
    }
}

/// Hooks through which the engine touches the outside world.
///
/// The engine owns its host and calls these synchronously from the
/// macrostep loop. Guards read [`Host::context`]; everything else the chart
/// does happens in [`Host::execute_content`] and the invocation hooks.
pub trait Host<D: Datamodel> {
    /// Extended state that guards are evaluated against.
    fn context(&self) -> &D::Context;

    /// Run one piece of entry, exit, transition or initial content.
    ///
    /// `event` is the event being processed, `None` during eventless steps
    /// and the initial entry. Returning `Err` stops the loop.
    fn execute_content(
        &mut self,
        content: &D::Content,
        event: Option<&Event>,
        outbox: &mut Outbox,
    ) -> Result<(), HostError>;

    /// Start the effect described by `invocation`.
    ///
    /// `sender` feeds the interpreter's external queue and may be moved into
    /// spawned tasks.
    fn invoke(&mut self, invocation: &Invocation<D>, sender: &EventSender)
        -> Result<(), HostError>;

    /// Stop a previously started invocation.
    ///
    /// Called while the owning state exits. A child interpreter should be
    /// stopped with [`ChildHandle::cancel`](crate::invoke::ChildHandle::cancel)
    /// so its own exit finishes first.
    fn cancel_invoke(&mut self, invocation: &Invocation<D>);

    /// Called before an event produced by `invocation` is processed.
    fn apply_finalize(&mut self, _invocation: &Invocation<D>, _event: &Event) {}

    /// Deliver `event` to a running invocation.
    fn forward(&mut self, invocation: &Invocation<D>, event: Event) {
        debug!(
            invoke_id = %invocation.id(),
            event = %event.name,
            "host does not forward events, dropping"
        );
    }

    /// Called once when a top-level final state is exited on halt.
    fn return_done_event(&mut self, _donedata: &Value) {}
}
