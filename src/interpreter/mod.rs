//! The macrostep interpreter.
//!
//! An [`Interpreter`] owns a running configuration of one [`Document`] and a
//! [`Host`]. It enters the initial configuration on construction and from
//! then on only moves when it is driven:
//!
//! - [`Interpreter::settle`] runs eventless transitions and internal events
//!   until the configuration is stable, then starts pending invocations.
//! - [`Interpreter::dispatch`] feeds external events and settles again.
//! - [`Interpreter::run`] does the same forever, suspending on the external
//!   queue, until a top-level final state is reached or it is cancelled.
//!
//! # Example
//!
//! ```rust
//! use statecraft::core::Event;
//! use statecraft::document::{final_state, initial, transition, Datamodel, Document, Invocation};
//! use statecraft::interpreter::{EventSender, Host, HostError, Interpreter, Outbox};
//! use statecraft::nodes;
//! use std::sync::Arc;
//!
//! struct Door;
//!
//! impl Datamodel for Door {
//!     type Context = ();
//!     type Content = &'static str;
//!     type Source = ();
//! }
//!
//! #[derive(Default)]
//! struct Log(Vec<&'static str>);
//!
//! impl Host<Door> for Log {
//!     fn context(&self) -> &() {
//!         &()
//!     }
//!
//!     fn execute_content(
//!         &mut self,
//!         content: &&'static str,
//!         _event: Option<&Event>,
//!         _outbox: &mut Outbox,
//!     ) -> Result<(), HostError> {
//!         self.0.push(*content);
//!         Ok(())
//!     }
//!
//!     fn invoke(&mut self, _: &Invocation<Door>, _: &EventSender) -> Result<(), HostError> {
//!         Ok(())
//!     }
//!
//!     fn cancel_invoke(&mut self, _: &Invocation<Door>) {}
//! }
//!
//! let document = Arc::new(
//!     Document::<Door>::build(nodes![
//!         initial("closed", nodes![transition(["open"]).to(["opened"]).action("creak")]),
//!         final_state("opened", nodes![]),
//!     ])
//!     .unwrap(),
//! );
//!
//! let mut door = Interpreter::new(document, Log::default()).unwrap();
//! assert!(door.is_active("closed"));
//!
//! door.dispatch(Event::new("open")).unwrap();
//! let halted = door.halt().unwrap();
//!
//! assert_eq!(halted.host.0, vec!["creak"]);
//! assert_eq!(halted.configuration, vec!["opened".to_string()]);
//! ```

mod error;
mod host;
mod microstep;
mod options;
mod select;
mod sender;

pub use error::EngineError;
pub use host::{Host, HostError, Outbox, INTERNAL_TARGET, PARENT_TARGET};
pub use options::Options;
pub use sender::EventSender;

use crate::core::{BlockingQueue, Event, EventKind, OrderedSet, Queue, Trace};
use crate::document::{Datamodel, Document, InvocationId, StateId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Whether an interpreter still processes events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Running,
    Stopped,
}

/// Why an interpreter stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaltReason {
    /// A top-level final state was entered.
    Completed,
    /// A cancel event was processed or the interpreter was halted early.
    Cancelled,
}

/// Everything left once an interpreter has stopped.
#[derive(Debug)]
pub struct Halted<H> {
    pub host: H,
    /// State ids active when the interpreter stopped, in declaration order.
    pub configuration: Vec<String>,
    pub reason: HaltReason,
    /// Done data of the top-level final state, when one was reached.
    pub done_data: Option<Value>,
    pub trace: Trace,
}

/// A running instance of a [`Document`].
pub struct Interpreter<D: Datamodel, H: Host<D>> {
    document: Arc<Document<D>>,
    host: H,
    options: Options,
    status: Status,
    running: bool,
    halt_reason: Option<HaltReason>,
    configuration: OrderedSet<StateId>,
    states_to_invoke: OrderedSet<StateId>,
    history: HashMap<StateId, Vec<StateId>>,
    internal_queue: Queue<Event>,
    external_queue: Arc<BlockingQueue<Event>>,
    active_invocations: OrderedSet<InvocationId>,
    final_configuration: Vec<String>,
    done_data: Option<Value>,
    trace: Trace,
}

impl<D: Datamodel, H: Host<D>> Interpreter<D, H> {
    /// Create an interpreter and enter the initial configuration.
    pub fn new(document: Arc<Document<D>>, host: H) -> Result<Self, EngineError> {
        Self::with_options(document, host, Options::default())
    }

    pub fn with_options(
        document: Arc<Document<D>>,
        host: H,
        options: Options,
    ) -> Result<Self, EngineError> {
        let mut interpreter = Self {
            document,
            host,
            options,
            status: Status::Running,
            running: true,
            halt_reason: None,
            configuration: OrderedSet::new(),
            states_to_invoke: OrderedSet::new(),
            history: HashMap::new(),
            internal_queue: Queue::new(),
            external_queue: Arc::new(BlockingQueue::new()),
            active_invocations: OrderedSet::new(),
            final_configuration: Vec::new(),
            done_data: None,
            trace: Trace::new(),
        };
        interpreter.enter_initial()?;
        Ok(interpreter)
    }

    /// Run microsteps until the configuration is stable and start the
    /// invocations of newly entered states.
    ///
    /// Performs the exit cleanup if the interpreter stops along the way.
    pub fn settle(&mut self) -> Result<(), EngineError> {
        while self.running {
            self.run_microsteps()?;
            if !self.running {
                break;
            }
            self.start_invocations()?;
            if self.internal_queue.is_empty() {
                return Ok(());
            }
        }
        self.exit_interpreter()
    }

    /// Enqueue `event` and process the external queue until it is empty.
    pub fn dispatch(&mut self, event: Event) -> Result<(), EngineError> {
        if self.status == Status::Stopped {
            return Err(EngineError::Stopped);
        }
        self.external_queue
            .enqueue(event.into_kind(EventKind::External));
        self.settle()?;
        while self.running {
            let Some(event) = self.external_queue.try_dequeue() else {
                break;
            };
            self.step(event)?;
        }
        Ok(())
    }

    /// Drive the interpreter until it stops, waiting for external events.
    ///
    /// A host error ends the loop. The exit cleanup still runs, so every
    /// started invocation is cancelled before the error is returned.
    pub async fn run(mut self) -> Result<Halted<H>, EngineError> {
        let queue = self.queue();
        let mut outcome = self.settle();
        while outcome.is_ok() && self.running {
            let event = queue.dequeue().await;
            outcome = self.step(event);
        }
        match outcome {
            Ok(()) => self.halt(),
            Err(error) => {
                self.abandon(&error);
                Err(error)
            }
        }
    }

    /// Stop the interpreter, running the exit cleanup if it has not run yet.
    pub fn halt(mut self) -> Result<Halted<H>, EngineError> {
        self.cancel()?;
        Ok(Halted {
            host: self.host,
            configuration: self.final_configuration,
            reason: self.halt_reason.unwrap_or(HaltReason::Cancelled),
            done_data: self.done_data,
            trace: self.trace,
        })
    }

    /// Run the interpreter on a tokio task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> (EventSender, JoinHandle<Result<Halted<H>, EngineError>>)
    where
        H: Send + 'static,
    {
        let sender = self.sender();
        let handle = tokio::spawn(self.run());
        (sender, handle)
    }

    /// Route `event` to `target`.
    ///
    /// `None` feeds this interpreter's external queue; otherwise the target
    /// is [`INTERNAL_TARGET`], [`PARENT_TARGET`] or the id of an active
    /// invocation, which receives the event through [`Host::forward`].
    pub fn send(&mut self, event: Event, target: Option<&str>) -> Result<(), EngineError> {
        match target {
            None => {
                self.external_queue
                    .enqueue(event.into_kind(EventKind::External));
                Ok(())
            }
            Some(INTERNAL_TARGET) => {
                self.internal_queue
                    .enqueue(event.into_kind(EventKind::Internal));
                Ok(())
            }
            Some(PARENT_TARGET) => match &self.options.parent {
                Some(parent) => {
                    let mut event = event.with_origin(self.options.name.clone());
                    if let Some(invoke_id) = &self.options.invoke_id {
                        event = event.with_invoke_id(invoke_id.clone());
                    }
                    parent.send(event);
                    Ok(())
                }
                None => Err(EngineError::NoParent {
                    name: self.options.name.clone(),
                }),
            },
            Some(target) => {
                let document = Arc::clone(&self.document);
                let invocation = self
                    .active_invocations
                    .iter()
                    .map(|id| document.invocation(*id))
                    .find(|invocation| invocation.id() == target);
                match invocation {
                    Some(invocation) => {
                        self.host.forward(invocation, event);
                        Ok(())
                    }
                    None => Err(EngineError::UnknownTarget {
                        target: target.to_string(),
                    }),
                }
            }
        }
    }

    /// A handle feeding this interpreter's external queue.
    pub fn sender(&self) -> EventSender {
        EventSender::new(Arc::clone(&self.external_queue))
    }

    pub(crate) fn queue(&self) -> Arc<BlockingQueue<Event>> {
        Arc::clone(&self.external_queue)
    }

    /// Ids of the active states in declaration order.
    pub fn state(&self) -> Vec<&str> {
        let mut active = self.configuration.to_list();
        active.sort_by_key(|id| self.document.state(*id).document_order);
        active
            .into_iter()
            .map(|id| self.document.state(id).id())
            .collect()
    }

    /// Whether every one of `ids` is active.
    pub fn matches(&self, ids: &[&str]) -> bool {
        ids.iter().all(|id| self.is_active(id))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.document
            .lookup(id)
            .is_some_and(|state| self.configuration.contains(&state))
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn document(&self) -> &Arc<Document<D>> {
        &self.document
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn stop(&mut self, reason: HaltReason) {
        self.running = false;
        self.halt_reason.get_or_insert(reason);
    }

    /// Process one external event and settle. Does nothing once stopped.
    pub(crate) fn step(&mut self, event: Event) -> Result<(), EngineError> {
        if self.status == Status::Stopped {
            return Ok(());
        }
        self.process_external(event)?;
        self.settle()
    }

    /// Stop in place and run the exit cleanup now.
    pub(crate) fn cancel(&mut self) -> Result<(), EngineError> {
        if self.status == Status::Stopped {
            return Ok(());
        }
        self.stop(HaltReason::Cancelled);
        self.exit_interpreter()
    }

    /// Clean up after `error` ended the loop.
    pub(crate) fn abandon(&mut self, error: &EngineError) {
        warn!(
            interpreter = %self.options.name,
            %error,
            "interpreter failed, running exit cleanup"
        );
        if let Err(cleanup) = self.cancel() {
            warn!(
                interpreter = %self.options.name,
                error = %cleanup,
                "exit cleanup failed"
            );
        }
    }

    fn process_external(&mut self, event: Event) -> Result<(), EngineError> {
        trace!(
            interpreter = %self.options.name,
            event = %event.name,
            kind = ?event.kind,
            "dequeued external event"
        );
        if event.is_cancel() {
            self.stop(HaltReason::Cancelled);
            return Ok(());
        }

        let document = Arc::clone(&self.document);
        for id in self.active_invocations.to_list() {
            let invocation = document.invocation(id);
            if event.invoke_id.as_deref() == Some(invocation.id()) {
                self.host.apply_finalize(invocation, &event);
            }
            if invocation.autoforward() || event.target.as_deref() == Some(invocation.id()) {
                self.host.forward(invocation, event.clone());
            }
        }

        let enabled = self.select_transitions(Some(&event));
        if !enabled.is_empty() {
            self.microstep(&enabled.to_list(), Some(&event))?;
        }
        Ok(())
    }

    /// Run `contents` in order, routing whatever each one sends.
    fn execute(&mut self, contents: &[D::Content], event: Option<&Event>) -> Result<(), EngineError> {
        for content in contents {
            let mut outbox = Outbox::new();
            let result = self.host.execute_content(content, event, &mut outbox);
            self.route(&mut outbox);
            result?;
        }
        Ok(())
    }

    fn route(&mut self, outbox: &mut Outbox) {
        let messages: Vec<_> = outbox.drain().collect();
        for (event, target) in messages {
            let name = event.name.clone();
            if let Err(error) = self.send(event, target.as_deref()) {
                warn!(
                    interpreter = %self.options.name,
                    event = %name,
                    %error,
                    "could not route event"
                );
                self.internal_queue.enqueue(
                    Event::internal("error.communication")
                        .with_data(json!({ "event": name, "message": error.to_string() })),
                );
            }
        }
    }
}
