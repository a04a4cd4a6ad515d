//! Document construction errors.

use thiserror::Error;

/// A single problem found while building a document.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("Transition in state '{source_state}' targets unknown state '{target}'")]
    UnresolvedTarget {
        source_state: String,
        target: String,
    },

    #[error("No top-level state is marked initial")]
    MissingInitialState,

    #[error("More than one top-level state is marked initial: {ids:?}")]
    MultipleInitialStates { ids: Vec<String> },

    #[error("State '{id}' is marked initial but is not a top-level state")]
    NestedInitialState { id: String },

    #[error("State id '{id}' is declared more than once")]
    DuplicateStateId { id: String },

    #[error("State id '{id}' is reserved for the document root")]
    ReservedStateId { id: String },

    #[error("Only states may appear at the top level of a document")]
    UnexpectedTopLevelNode,

    #[error("History state '{id}' must have exactly one transition with a target")]
    InvalidHistoryDefault { id: String },

    #[error("History state '{id}' must be a leaf inside a state with other children")]
    InvalidHistoryPlacement { id: String },

    #[error("Final state '{id}' cannot have child states")]
    FinalWithChildren { id: String },

    #[error("Initial transition of '{id}' must target its descendants exactly once")]
    InvalidInitialTransition { id: String },

    #[error("Invocation id '{invoke_id}' is used twice in state '{state}'")]
    DuplicateInvokeId { state: String, invoke_id: String },
}

/// Errors returned by [`Document::build`](super::Document::build).
#[derive(Debug, Error)]
pub enum BuildError {
    /// Every schema violation found, not just the first.
    #[error("Document is invalid ({} problem(s)): {}", .0.len(), describe(.0))]
    Invalid(Vec<SchemaError>),
}

impl BuildError {
    pub fn errors(&self) -> &[SchemaError] {
        match self {
            BuildError::Invalid(errors) => errors,
        }
    }
}

fn describe(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
