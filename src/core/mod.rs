//! Core building blocks shared by the document model and the interpreter.
//!
//! - Guards over extended state
//! - Events and event-name matching
//! - Document, entry and exit ordering
//! - Ordered sets and event queues
//! - Microstep traces
//!
//! Nothing in this module knows about state charts as a whole.

mod event;
mod guard;
mod order;
mod ordered_set;
mod queue;
mod trace;

pub use event::{name_matches, Event, EventKind, CANCEL_EVENT};
pub use guard::Guard;
pub use order::{document_order, entry_order, exit_order, DocumentPosition};
pub use ordered_set::OrderedSet;
pub use queue::{BlockingQueue, Queue};
pub use trace::{Microstep, Trace};
