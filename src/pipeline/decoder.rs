use std::collections::VecDeque;

use crate::common::Frame;
use crate::pipeline::types::Detection;

/// External optical decoder: at most one code per frame.
pub trait CodeDecoder: Send {
    fn decode(&mut self, frame: &Frame) -> Option<Detection>;
}

impl<F> CodeDecoder for F
where
    F: FnMut(&Frame) -> Option<Detection> + Send,
{
    fn decode(&mut self, frame: &Frame) -> Option<Detection> {
        self(frame)
    }
}

/// Replays a fixed sequence of decode results, one per call, then sees nothing.
pub struct ScriptedDecoder {
    script: VecDeque<Option<Detection>>,
}

impl ScriptedDecoder {
    pub fn new(script: impl IntoIterator<Item = Option<Detection>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl CodeDecoder for ScriptedDecoder {
    fn decode(&mut self, _frame: &Frame) -> Option<Detection> {
        self.script.pop_front().flatten()
    }
}
