//! Microstep trace.
//!
//! Records which states each microstep exited and entered, for diagnostics
//! and introspection. Not to be confused with history states, which restore
//! configurations; the trace never influences execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single microstep.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Microstep;
/// use chrono::Utc;
///
/// let step = Microstep {
///     event: Some("GO".to_string()),
///     exited: vec!["idle".to_string()],
///     entered: vec!["running".to_string()],
///     timestamp: Utc::now(),
/// };
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Microstep {
    /// Name of the event that enabled the transitions, `None` if eventless
    pub event: Option<String>,
    /// Ids of exited states, in exit order
    pub exited: Vec<String>,
    /// Ids of entered states, in entry order
    pub entered: Vec<String>,
    /// When the microstep completed
    pub timestamp: DateTime<Utc>,
}

/// Ordered record of microsteps taken by an interpreter.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{Microstep, Trace};
/// use chrono::Utc;
///
/// let mut trace = Trace::new();
/// trace.record(Microstep {
///     event: None,
///     exited: vec![],
///     entered: vec!["idle".to_string()],
///     timestamp: Utc::now(),
/// });
/// trace.record(Microstep {
///     event: Some("GO".to_string()),
///     exited: vec!["idle".to_string()],
///     entered: vec!["running".to_string()],
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(trace.entered(), vec!["idle", "running"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    steps: Vec<Microstep>,
}

impl Trace {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn record(&mut self, step: Microstep) {
        self.steps.push(step);
    }

    /// All recorded microsteps, oldest first.
    pub fn steps(&self) -> &[Microstep] {
        &self.steps
    }

    /// Ids of every entered state, in the order they were entered.
    pub fn entered(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|step| step.entered.iter().map(String::as_str))
            .collect()
    }

    /// Names of the events that caused microsteps, eventless steps skipped.
    pub fn events(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|step| step.event.as_deref())
            .collect()
    }

    /// Time between the first and last microstep, `None` when empty.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.steps.first(), self.steps.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(event: Option<&str>, exited: &[&str], entered: &[&str]) -> Microstep {
        Microstep {
            event: event.map(str::to_string),
            exited: exited.iter().map(|s| s.to_string()).collect(),
            entered: entered.iter().map(|s| s.to_string()).collect(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_trace_is_empty() {
        let trace = Trace::new();
        assert!(trace.is_empty());
        assert!(trace.entered().is_empty());
        assert!(trace.duration().is_none());
    }

    #[test]
    fn entered_flattens_steps_in_order() {
        let mut trace = Trace::new();
        trace.record(step(None, &[], &["a1", "a"]));
        trace.record(step(Some("NEXT"), &["a1"], &["a2"]));

        assert_eq!(trace.len(), 2);
        assert_eq!(trace.entered(), vec!["a1", "a", "a2"]);
        assert_eq!(trace.events(), vec!["NEXT"]);
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let mut trace = Trace::new();
        trace.record(step(None, &[], &["idle"]));

        std::thread::sleep(std::time::Duration::from_millis(10));

        trace.record(step(Some("GO"), &["idle"], &["running"]));

        let duration = trace.duration();
        assert!(duration.is_some());
        assert!(duration.unwrap() >= std::time::Duration::from_millis(10));
    }

    #[test]
    fn trace_serializes_correctly() {
        let mut trace = Trace::new();
        trace.record(step(Some("GO"), &["idle"], &["running"]));

        let json = serde_json::to_string(&trace).unwrap();
        let deserialized: Trace = serde_json::from_str(&json).unwrap();

        assert_eq!(trace, deserialized);
    }
}
