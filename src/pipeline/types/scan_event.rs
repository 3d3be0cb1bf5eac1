use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::pipeline::types::CodeType;

/// An accepted detection on its way to the commit worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub code_value: String,
    pub code_type: CodeType,
    pub detected_at: DateTime<Utc>,
}

impl ScanEvent {
    /// Builds an event from a value the decoder already vetted.
    pub fn new(code_value: impl Into<String>, code_type: CodeType, detected_at: DateTime<Utc>) -> Self {
        let code_value = code_value.into();
        debug_assert!(!code_value.trim().is_empty(), "scan event without a code value");
        Self {
            code_value,
            code_type,
            detected_at,
        }
    }

    pub fn try_new(
        code_value: impl Into<String>,
        code_type: CodeType,
        detected_at: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        let code_value = code_value.into();
        if code_value.trim().is_empty() {
            return Err(AppError::MalformedEvent(format!(
                "empty {} payload at {}",
                code_type, detected_at
            )));
        }
        Ok(Self {
            code_value,
            code_type,
            detected_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_new_rejects_empty_payload() {
        let err = ScanEvent::try_new("", CodeType::QrCode, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::MalformedEvent(_)));
        assert!(ScanEvent::try_new("A1", CodeType::QrCode, Utc::now()).is_ok());
    }
}
