//! Running invoked effects on tokio tasks.
//!
//! The engine only tells a [`Host`] when to start and stop an invocation.
//! These helpers cover the two common cases a host implements:
//!
//! - [`spawn_effect`] runs an async function and reports its outcome as
//!   `done.invoke.<id>` or `error.invoke.<id>`, restarting it according to
//!   its [`ErrorPolicy`].
//! - [`spawn_child`] runs another chart as a child interpreter whose
//!   completion arrives as `done.invoke.<id>`.
//!
//! Both report back through the parent's [`EventSender`], so results are
//! ordinary external events the parent can transition on.
//!
//! # Example
//!
//! ```rust
//! use statecraft::invoke::{spawn_effect, ErrorPolicy};
//! # use statecraft::document::{initial, Datamodel, Document};
//! # use statecraft::interpreter::{EventSender, Host, HostError, Interpreter, Outbox};
//! # use statecraft::core::Event;
//! # use statecraft::nodes;
//! # use std::sync::Arc;
//! # struct Quiet;
//! # impl Datamodel for Quiet { type Context = (); type Content = (); type Source = (); }
//! # struct Nothing;
//! # impl Host<Quiet> for Nothing {
//! #     fn context(&self) -> &() { &() }
//! #     fn execute_content(&mut self, _: &(), _: Option<&Event>, _: &mut Outbox) -> Result<(), HostError> { Ok(()) }
//! #     fn invoke(&mut self, _: &statecraft::document::Invocation<Quiet>, _: &EventSender) -> Result<(), HostError> { Ok(()) }
//! #     fn cancel_invoke(&mut self, _: &statecraft::document::Invocation<Quiet>) {}
//! # }
//! # let document = Arc::new(Document::<Quiet>::build(nodes![initial("idle", nodes![])]).unwrap());
//! # let interpreter = Interpreter::new(document, Nothing).unwrap();
//! let sender = interpreter.sender();
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! runtime.block_on(async {
//!     let handle = spawn_effect("fetch", ErrorPolicy::Propagate, sender.clone(), |_| async {
//!         Ok(serde_json::json!({ "rows": 3 }))
//!     });
//!     handle.join().await;
//! });
//!
//! assert_eq!(sender.pending(), 1);
//! ```
//!
//! [`Host`]: crate::interpreter::Host

use crate::core::{BlockingQueue, Event};
use crate::document::{Datamodel, Document};
use crate::interpreter::{EngineError, EventSender, Halted, Host, Interpreter, Options, Status};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What an effect helper does after the effect fails.
///
/// The engine carries this on each invocation and never interprets it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Report `error.invoke.<id>` and stop.
    #[default]
    Propagate,
    /// Report `error.invoke.<id>` and run the effect again, at most
    /// `max_restarts` times.
    Restart { max_restarts: usize },
}

impl ErrorPolicy {
    /// Whether another attempt is allowed after `failures` failures.
    pub fn allows_restart(&self, failures: usize) -> bool {
        match self {
            ErrorPolicy::Propagate => false,
            ErrorPolicy::Restart { max_restarts } => failures <= *max_restarts,
        }
    }
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("{message}")]
    Failed { message: String },

    #[error("Task for invocation '{invoke_id}' did not finish: {message}")]
    Join { invoke_id: String, message: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl InvokeError {
    pub fn failed(message: impl Into<String>) -> Self {
        InvokeError::Failed {
            message: message.into(),
        }
    }
}

fn done_event(invoke_id: &str, data: Value) -> Event {
    Event::new(format!("done.invoke.{invoke_id}"))
        .with_invoke_id(invoke_id)
        .with_data(data)
}

fn error_event(invoke_id: &str, error: &dyn std::error::Error) -> Event {
    Event::new(format!("error.invoke.{invoke_id}"))
        .with_invoke_id(invoke_id)
        .with_data(json!({ "message": error.to_string() }))
}

/// A running effect started by [`spawn_effect`].
#[derive(Debug)]
pub struct EffectHandle {
    invoke_id: String,
    join: JoinHandle<()>,
}

impl EffectHandle {
    pub fn invoke_id(&self) -> &str {
        &self.invoke_id
    }

    /// Abort the effect. No further events are sent for it.
    pub fn cancel(&self) {
        debug!(invoke_id = %self.invoke_id, "aborting effect");
        self.join.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the effect to finish or be aborted.
    pub async fn join(self) {
        // an aborted task is a normal outcome here
        let _ = self.join.await;
    }
}

/// Run `factory` on a tokio task and report its outcome to `sender`.
///
/// `factory` receives its own sender so the effect can emit intermediate
/// events. It is called again after each failure while `policy` allows.
/// Must be called from within a tokio runtime.
pub fn spawn_effect<F, Fut>(
    invoke_id: impl Into<String>,
    policy: ErrorPolicy,
    sender: EventSender,
    factory: F,
) -> EffectHandle
where
    F: Fn(EventSender) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value, InvokeError>> + Send + 'static,
{
    let invoke_id = invoke_id.into();
    let id = invoke_id.clone();

    let join = tokio::spawn(async move {
        let mut failures = 0;
        loop {
            match factory(sender.clone()).await {
                Ok(data) => {
                    sender.send(done_event(&id, data));
                    return;
                }
                Err(error) => {
                    failures += 1;
                    warn!(invoke_id = %id, %error, failures, "invoked effect failed");
                    sender.send(error_event(&id, &error));
                    if !policy.allows_restart(failures) {
                        return;
                    }
                }
            }
        }
    });

    EffectHandle { invoke_id, join }
}

type SharedChild<D, H> = Arc<Mutex<Option<Interpreter<D, H>>>>;

fn with_child<D, H, R>(
    child: &SharedChild<D, H>,
    f: impl FnOnce(&mut Interpreter<D, H>) -> R,
) -> Option<R>
where
    D: Datamodel,
    H: Host<D>,
{
    let mut guard = child.lock().unwrap_or_else(PoisonError::into_inner);
    guard.as_mut().map(f)
}

/// A child interpreter started by [`spawn_child`].
///
/// The handle shares the child with the task running it, so the parent can
/// stop the child in place from [`Host::cancel_invoke`].
pub struct ChildHandle<D: Datamodel, H: Host<D>> {
    invoke_id: String,
    sender: EventSender,
    child: SharedChild<D, H>,
    join: JoinHandle<Result<Halted<H>, EngineError>>,
}

impl<D: Datamodel, H: Host<D>> ChildHandle<D, H> {
    pub fn invoke_id(&self) -> &str {
        &self.invoke_id
    }

    pub fn sender(&self) -> &EventSender {
        &self.sender
    }

    /// Deliver `event` to the child's external queue.
    pub fn forward(&self, event: Event) {
        self.sender.send(event);
    }

    /// Stop the child and run its exit cleanup before returning.
    ///
    /// Waits for a step the child is in the middle of, then exits every
    /// active state and cancels the child's own invocations. The task
    /// running the child is woken and finishes on its own.
    pub fn cancel(&self) -> Result<(), EngineError> {
        debug!(invoke_id = %self.invoke_id, "cancelling child interpreter");
        let outcome = with_child(&self.child, Interpreter::cancel).unwrap_or(Ok(()));
        self.sender.cancel();
        outcome
    }

    /// Stopped once the child has exited, whether or not its task has
    /// finished yet.
    pub fn status(&self) -> Status {
        with_child(&self.child, |child| child.status()).unwrap_or(Status::Stopped)
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the child to stop and take what it left behind.
    pub async fn join(self) -> Result<Halted<H>, InvokeError> {
        match self.join.await {
            Ok(result) => result.map_err(InvokeError::from),
            Err(error) => Err(InvokeError::Join {
                invoke_id: self.invoke_id,
                message: error.to_string(),
            }),
        }
    }
}

async fn drive_child<D, H>(
    child: &SharedChild<D, H>,
    queue: &BlockingQueue<Event>,
) -> Result<(), EngineError>
where
    D: Datamodel,
    H: Host<D>,
{
    with_child(child, Interpreter::settle).unwrap_or(Ok(()))?;
    while with_child(child, |c| c.status() == Status::Running).unwrap_or(false) {
        let event = queue.dequeue().await;
        with_child(child, |c| c.step(event)).unwrap_or(Ok(()))?;
    }
    Ok(())
}

/// Start `document` as a child of the interpreter behind `parent`.
///
/// The child enters its initial configuration before this returns and then
/// runs on a tokio task. It sends `done.invoke.<invoke_id>` with its done
/// data when it completes, or `error.invoke.<invoke_id>` if its host fails.
/// Must be called from within a tokio runtime.
pub fn spawn_child<D, H>(
    document: Arc<Document<D>>,
    host: H,
    parent: &EventSender,
    invoke_id: impl Into<String>,
) -> Result<ChildHandle<D, H>, EngineError>
where
    D: Datamodel,
    H: Host<D> + Send + 'static,
{
    let invoke_id = invoke_id.into();
    let options = Options::new()
        .name(invoke_id.clone())
        .parent(parent.clone())
        .invoke_id(invoke_id.clone());
    let interpreter = Interpreter::with_options(document, host, options)?;
    let sender = interpreter.sender();
    let queue = interpreter.queue();
    let child: SharedChild<D, H> = Arc::new(Mutex::new(Some(interpreter)));

    let shared = Arc::clone(&child);
    let parent = parent.clone();
    let id = invoke_id.clone();
    let join = tokio::spawn(async move {
        let outcome = drive_child(&shared, &queue).await;
        let taken = shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut interpreter) = taken else {
            return Err(EngineError::Stopped);
        };
        match outcome {
            Ok(()) => interpreter.halt(),
            Err(error) => {
                interpreter.abandon(&error);
                warn!(invoke_id = %id, %error, "child interpreter failed");
                parent.send(error_event(&id, &error));
                Err(error)
            }
        }
    });

    Ok(ChildHandle {
        invoke_id,
        sender,
        child,
        join,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn channel() -> (EventSender, Arc<BlockingQueue<Event>>) {
        let queue = Arc::new(BlockingQueue::new());
        (EventSender::new(Arc::clone(&queue)), queue)
    }

    #[test]
    fn restart_policy_counts_failures() {
        let policy = ErrorPolicy::Restart { max_restarts: 2 };
        assert!(policy.allows_restart(1));
        assert!(policy.allows_restart(2));
        assert!(!policy.allows_restart(3));
        assert!(!ErrorPolicy::Propagate.allows_restart(1));
    }

    #[tokio::test]
    async fn successful_effect_reports_done() {
        let (sender, queue) = channel();

        spawn_effect("fetch", ErrorPolicy::Propagate, sender, |_| async {
            Ok(json!({ "rows": 3 }))
        })
        .join()
        .await;

        let event = queue.dequeue().await;
        assert_eq!(event.name, "done.invoke.fetch");
        assert_eq!(event.invoke_id.as_deref(), Some("fetch"));
        assert_eq!(event.data["rows"], 3);
    }

    #[tokio::test]
    async fn failing_effect_reports_error_and_stops() {
        let (sender, queue) = channel();

        spawn_effect("fetch", ErrorPolicy::Propagate, sender, |_| async {
            Err(InvokeError::failed("boom"))
        })
        .join()
        .await;

        let event = queue.dequeue().await;
        assert_eq!(event.name, "error.invoke.fetch");
        assert_eq!(event.data["message"], "boom");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn restart_policy_retries_until_success() {
        let (sender, queue) = channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        spawn_effect(
            "flaky",
            ErrorPolicy::Restart { max_restarts: 3 },
            sender,
            move |_| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(InvokeError::failed("not yet"))
                    } else {
                        Ok(json!(attempt))
                    }
                }
            },
        )
        .join()
        .await;

        let names: Vec<String> = std::iter::from_fn(|| queue.try_dequeue())
            .map(|event| event.name)
            .collect();
        assert_eq!(
            names,
            vec!["error.invoke.flaky", "error.invoke.flaky", "done.invoke.flaky"]
        );
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancelled_effect_sends_nothing() {
        let (sender, queue) = channel();

        let handle = spawn_effect("slow", ErrorPolicy::Propagate, sender, |_| async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(Value::Null)
        });
        handle.cancel();
        handle.join().await;

        assert!(queue.is_empty());
    }
}
