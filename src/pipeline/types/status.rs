use serde::Serialize;

use crate::pipeline::types::{CommitResult, ScanEvent};

/// Latest human-readable state of a checkpoint, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScanStatus {
    Assessing(ScanEvent),
    Finished(CommitResult),
}

impl ScanStatus {
    pub fn message(&self) -> String {
        match self {
            ScanStatus::Assessing(event) => format!("Assessing: {}", event.code_value),
            ScanStatus::Finished(result) => result.message.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            ScanStatus::Assessing(_) => true,
            ScanStatus::Finished(result) => result.ok,
        }
    }

    pub fn event(&self) -> &ScanEvent {
        match self {
            ScanStatus::Assessing(event) => event,
            ScanStatus::Finished(result) => &result.event,
        }
    }

    pub fn is_assessing(&self) -> bool {
        matches!(self, ScanStatus::Assessing(_))
    }
}
