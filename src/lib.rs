//! Statecraft: hierarchical state charts with SCXML semantics
//!
//! Statecraft separates a chart's *document*, an immutable tree of states,
//! transitions and invocations, from the *interpreter* that runs it. The
//! interpreter follows the SCXML macrostep algorithm: eventless transitions
//! and internal events run to completion before the next external event is
//! taken, conflicts are resolved in favour of deeper sources, and history
//! states restore what was active when their parent was left.
//!
//! Everything the chart does to the outside world goes through a single
//! [`Host`](interpreter::Host) supplied by the caller.
//!
//! # Core Concepts
//!
//! - **Document**: validated chart built from declarations with [`nodes!`]
//! - **Datamodel**: the guard context, content and invocation source types
//! - **Host**: executes content and manages invocations
//! - **Interpreter**: drives a document, synchronously or on a tokio task
//!
//! # Example
//!
//! ```rust
//! use statecraft::core::Event;
//! use statecraft::document::{final_state, initial, transition, Datamodel, Document, Invocation};
//! use statecraft::interpreter::{EventSender, Host, HostError, Interpreter, Outbox, Status};
//! use statecraft::nodes;
//! use std::sync::Arc;
//!
//! struct Counter;
//!
//! impl Datamodel for Counter {
//!     type Context = u32;
//!     type Content = ();
//!     type Source = ();
//! }
//!
//! struct Tally(u32);
//!
//! impl Host<Counter> for Tally {
//!     fn context(&self) -> &u32 {
//!         &self.0
//!     }
//!
//!     fn execute_content(
//!         &mut self,
//!         _content: &(),
//!         _event: Option<&Event>,
//!         _outbox: &mut Outbox,
//!     ) -> Result<(), HostError> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//!
//!     fn invoke(&mut self, _: &Invocation<Counter>, _: &EventSender) -> Result<(), HostError> {
//!         Ok(())
//!     }
//!
//!     fn cancel_invoke(&mut self, _: &Invocation<Counter>) {}
//! }
//!
//! let document = Document::<Counter>::build(nodes![
//!     initial("counting", nodes![
//!         transition(["tick"]).action(()),
//!         transition(Vec::<String>::new()).when(|count: &u32| *count >= 2).to(["done"]),
//!     ]),
//!     final_state("done", nodes![]),
//! ])
//! .unwrap();
//!
//! let mut chart = Interpreter::new(Arc::new(document), Tally(0)).unwrap();
//! chart.dispatch(Event::new("tick")).unwrap();
//! assert!(chart.is_active("counting"));
//!
//! chart.dispatch(Event::new("tick")).unwrap();
//! assert_eq!(chart.status(), Status::Stopped);
//! ```

pub mod core;
pub mod document;
pub mod interpreter;
pub mod invoke;

// Re-export commonly used types
pub use crate::core::{Event, EventKind, Guard, OrderedSet, Trace};
pub use document::{BuildError, Datamodel, Document, SchemaError, StateId};
pub use interpreter::{
    EngineError, EventSender, HaltReason, Halted, Host, HostError, Interpreter, Options, Outbox,
    Status,
};
pub use invoke::ErrorPolicy;
