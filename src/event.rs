use std::fmt;

use serde::Serialize;

use crate::api::StatusDocument;
use crate::job::JobId;

/// Known non-terminal states, with their display classification.
/// Anything else that is not terminal is passed through as an opaque event.
const WAITING_STATES: &[(&str, &str, &str, &str)] = &[
    ("queued", "⏳", "Queued", "white"),
    ("provisioning", "⚙", "Provisioning", "white"),
    ("building", "⚗", "Building", "cyan"),
    ("running", "⚗", "Running", "cyan"),
];

/// States after which no further transitions occur for a submission.
/// `error` is only effectively terminal once the resubmission budget is spent.
pub fn is_terminal(state: &str) -> bool {
    matches!(state, "complete" | "finished" | "error")
}

/// Outcome classification carried only by final events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Reported `pass` with zero warnings.
    Pass,
    /// Reported `pass` with a nonzero warning count.
    Warning,
    /// Reported `fail`.
    Fail,
    /// Infrastructure or tooling error, message taken from the server.
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "PASS"),
            Outcome::Warning => write!(f, "WARN"),
            Outcome::Fail => write!(f, "FAIL"),
            Outcome::Error => write!(f, "ERROR"),
        }
    }
}

/// One observed state transition of a remote job. Immutable once built.
///
/// Exactly one event per watched job has `is_final = true`, and it is
/// always the last one yielded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateEvent {
    /// Identity snapshot of the job this event belongs to.
    pub job: JobId,
    /// Server-reported state string.
    pub state: String,
    /// Outcome classification, present only on final events.
    pub status: Option<Outcome>,
    /// Human-readable summary.
    pub message: String,
    pub warnings: u32,
    pub errors: u32,
    /// Presentation hints, opaque to consumers.
    pub icon: &'static str,
    pub color: &'static str,
    pub is_final: bool,
}

impl StateEvent {
    /// Event for a recognized waiting state, or an opaque passthrough event
    /// for an unrecognized non-terminal state so the consumer is never
    /// silently blocked on an unknown state.
    pub(crate) fn waiting(job: JobId, state: &str) -> Self {
        let (icon, message, color) = WAITING_STATES
            .iter()
            .find(|(name, ..)| *name == state)
            .map(|(_, icon, message, color)| (*icon, message.to_string(), *color))
            .unwrap_or(("?", state.to_string(), "white"));
        Self {
            job,
            state: state.to_string(),
            status: None,
            message,
            warnings: 0,
            errors: 0,
            icon,
            color,
            is_final: false,
        }
    }

    /// Non-final event describing an automatic resubmission after an
    /// `error` state.
    pub(crate) fn retry(job: JobId, attempt: u32, budget: u32) -> Self {
        Self {
            job,
            state: "error".to_string(),
            status: None,
            message: format!("Error, resubmitting (attempt {attempt} of {budget})"),
            warnings: 0,
            errors: 0,
            icon: "↻",
            color: "yellow",
            is_final: false,
        }
    }

    /// Final event for a terminal status document.
    ///
    /// `pass` with zero warnings is a success; `pass` with warnings a
    /// success-with-warnings; `fail` a failure with an error count; anything
    /// else an infrastructure error with the server's message verbatim.
    pub(crate) fn terminal(job: JobId, doc: &StatusDocument) -> Self {
        let (status, icon, color, message, warnings, errors) = match doc.result.as_deref() {
            Some("pass") if doc.warnings_count == 0 => {
                (Outcome::Pass, "✓", "green", "Pass".to_string(), 0, 0)
            }
            Some("pass") => (
                Outcome::Warning,
                "⚠",
                "yellow",
                format!("Pass ({} warnings)", doc.warnings_count),
                doc.warnings_count,
                0,
            ),
            Some("fail") => (
                Outcome::Fail,
                "✗",
                "red",
                format!("Fail ({} errors)", doc.errors_count),
                doc.warnings_count,
                doc.errors_count,
            ),
            _ => {
                let message = if doc.status_message.is_empty() {
                    doc.state.clone()
                } else {
                    doc.status_message.clone()
                };
                (Outcome::Error, "🧨", "red", message, 0, 0)
            }
        };
        Self {
            job,
            state: doc.state.clone(),
            status: Some(status),
            message,
            warnings,
            errors,
            icon,
            color,
            is_final: true,
        }
    }
}
