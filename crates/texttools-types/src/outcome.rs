//! User-facing status of a connect or submit attempt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::TextToolsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    #[default]
    None,
    Hint,
    Ok,
    Error,
}

/// Status message shown to the user. Replaced, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SubmissionOutcome {
    pub kind: OutcomeKind,
    pub message: String,
}

impl SubmissionOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn hint(message: impl Into<String>) -> Self {
        Self { kind: OutcomeKind::Hint, message: message.into() }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self { kind: OutcomeKind::Ok, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: OutcomeKind::Error, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        self.kind == OutcomeKind::Error
    }
}

impl From<&TextToolsError> for SubmissionOutcome {
    fn from(err: &TextToolsError) -> Self {
        Self::error(err.to_string())
    }
}

/// The single most-recent outcome, shared by the session manager and the
/// submitter.
#[derive(Debug, Clone, Default)]
pub struct OutcomeSlot {
    inner: Arc<Mutex<SubmissionOutcome>>,
}

impl OutcomeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SubmissionOutcome> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> SubmissionOutcome {
        self.lock().clone()
    }

    /// Store `outcome` in place of the previous one and hand it back.
    pub fn replace(&self, outcome: SubmissionOutcome) -> SubmissionOutcome {
        *self.lock() = outcome.clone();
        outcome
    }

    pub fn reset(&self) {
        *self.lock() = SubmissionOutcome::none();
    }
}
