use serde::Serialize;

use crate::pipeline::types::ScanEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CommitOutcome {
    Logged,
    DuplicateDenied,
    Failed(String),
}

/// Outcome of one commit attempt. Published once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub ok: bool,
    pub message: String,
    pub event: ScanEvent,
    pub outcome: CommitOutcome,
}

impl CommitResult {
    pub fn logged(event: ScanEvent) -> Self {
        Self {
            ok: true,
            message: format!("OK: {}", event.code_value),
            event,
            outcome: CommitOutcome::Logged,
        }
    }

    pub fn duplicate(event: ScanEvent) -> Self {
        Self {
            ok: false,
            message: "DENIED: duplicate".to_string(),
            event,
            outcome: CommitOutcome::DuplicateDenied,
        }
    }

    pub fn failed(event: ScanEvent, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            ok: false,
            message: reason.clone(),
            event,
            outcome: CommitOutcome::Failed(reason),
        }
    }
}
