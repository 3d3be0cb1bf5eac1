use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::common::Frame;
use crate::config::SceneStep;
use crate::pipeline::types::{BoundingBox, CodeType, Detection};

/// Where the card sits in a synthetic frame: (x, y, width, height).
pub const CARD_RECT: (i32, i32, i32, i32) = (96, 64, 128, 112);

/// What is in front of the demo camera over time. The script loops.
#[derive(Debug, Clone)]
pub struct SimulatedScene {
    steps: Vec<SceneStep>,
    started_at: DateTime<Utc>,
    cycle_ms: i64,
}

impl SimulatedScene {
    pub fn new(steps: Vec<SceneStep>, started_at: DateTime<Utc>) -> Self {
        let total_ms = steps
            .iter()
            .fold(0_u64, |total, step| total.saturating_add(step.duration_ms));
        Self {
            steps,
            started_at,
            cycle_ms: i64::try_from(total_ms).unwrap_or(i64::MAX),
        }
    }

    /// Code held up to the camera at `at`, if any.
    pub fn code_at(&self, at: DateTime<Utc>) -> Option<&str> {
        let cycle_ms = self.cycle_ms;
        if cycle_ms <= 0 {
            return None;
        }
        let elapsed = (at - self.started_at).num_milliseconds().max(0);
        let mut offset = elapsed % cycle_ms;
        for step in &self.steps {
            let duration = i64::try_from(step.duration_ms).unwrap_or(i64::MAX);
            if offset < duration {
                return step.code.as_deref();
            }
            offset -= duration;
        }
        None
    }
}

/// Decoder for frames of the synthetic camera: reports the scene's code at
/// the frame's capture time.
pub struct SceneDecoder {
    scene: Arc<SimulatedScene>,
    code_type: CodeType,
}

impl SceneDecoder {
    pub fn new(scene: Arc<SimulatedScene>) -> Self {
        Self {
            scene,
            code_type: CodeType::QrCode,
        }
    }

    pub fn with_code_type(mut self, code_type: CodeType) -> Self {
        self.code_type = code_type;
        self
    }
}

impl crate::pipeline::decoder::CodeDecoder for SceneDecoder {
    fn decode(&mut self, frame: &Frame) -> Option<Detection> {
        let code = self.scene.code_at(frame.captured_at())?;
        let (x, y, width, height) = CARD_RECT;
        Some(
            Detection::new(code, self.code_type)
                .with_bounding_box(BoundingBox::from_rect(x, y, width, height)),
        )
    }
}
