//! Events exchanged with and inside an interpreter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name given to cancellation events.
pub const CANCEL_EVENT: &str = "cancel";

/// Where an event came from, as far as the engine is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Raised by the engine itself or by executable content.
    Internal,
    /// Delivered through the external queue.
    External,
    /// Stops the interpreter and runs its exit cleanup.
    Cancel,
}

/// An event processed by the interpreter.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Event, EventKind};
/// use serde_json::json;
///
/// let event = Event::new("order.submitted").with_data(json!({ "id": 7 }));
///
/// assert_eq!(event.kind, EventKind::External);
/// assert_eq!(event.data["id"], 7);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub kind: EventKind,
    /// Id of the invocation that produced this event, if any.
    pub invoke_id: Option<String>,
    /// Name of the interpreter that sent this event, if any.
    pub origin: Option<String>,
    pub data: Value,
    /// Id of an invocation the event should be forwarded to.
    pub target: Option<String>,
}

impl Event {
    /// Create an external event with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EventKind::External,
            invoke_id: None,
            origin: None,
            data: Value::Null,
            target: None,
        }
    }

    /// Create an internal event with no payload.
    pub fn internal(name: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Internal,
            ..Self::new(name)
        }
    }

    /// Create a cancellation event.
    pub fn cancel() -> Self {
        Self {
            kind: EventKind::Cancel,
            ..Self::new(CANCEL_EVENT)
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_invoke_id(mut self, invoke_id: impl Into<String>) -> Self {
        self.invoke_id = Some(invoke_id.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn is_cancel(&self) -> bool {
        self.kind == EventKind::Cancel
    }

    /// Re-label this event with `kind`. Cancel events keep their kind.
    pub(crate) fn into_kind(mut self, kind: EventKind) -> Self {
        if !self.is_cancel() {
            self.kind = kind;
        }
        self
    }
}

/// Check an event name against a transition's event pattern.
///
/// Patterns match on whole dot-separated tokens: `done` matches `done` and
/// `done.state.a` but not `doneness`. `*` matches every name and a trailing
/// `.*` is ignored.
pub fn name_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let pattern = pattern.strip_suffix(".*").unwrap_or(pattern);
    match name.strip_prefix(pattern) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}
