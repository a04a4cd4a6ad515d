use super::HostError;
use thiserror::Error;

/// Errors returned while driving an interpreter.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A host hook failed. The step it belonged to is not retried.
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("No active invocation or special target named '{target}'")]
    UnknownTarget { target: String },

    #[error("Interpreter '{name}' has no parent to send to")]
    NoParent { name: String },

    #[error("Interpreter has already stopped")]
    Stopped,
}
