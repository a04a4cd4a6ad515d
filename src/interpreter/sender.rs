use crate::core::{BlockingQueue, Event, EventKind};
use std::fmt;
use std::sync::Arc;

/// Cloneable handle feeding an interpreter's external queue.
///
/// Safe to move across threads and tasks; every enqueue wakes the
/// interpreter if it is waiting.
#[derive(Clone)]
pub struct EventSender {
    queue: Arc<BlockingQueue<Event>>,
}

impl EventSender {
    pub(crate) fn new(queue: Arc<BlockingQueue<Event>>) -> Self {
        Self { queue }
    }

    /// Enqueue `event` as an external event.
    pub fn send(&self, event: Event) {
        self.queue.enqueue(event.into_kind(EventKind::External));
    }

    /// Ask the interpreter to stop and run its exit cleanup.
    pub fn cancel(&self) {
        self.queue.enqueue(Event::cancel());
    }

    /// Number of events not yet taken by the interpreter.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("pending", &self.pending())
            .finish()
    }
}
