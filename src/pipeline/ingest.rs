use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::common::Frame;
use crate::pipeline::debounce::{DebounceGate, DebounceState};
use crate::pipeline::decoder::CodeDecoder;
use crate::pipeline::services::{CommitDispatcher, FrameAnnotator};
use crate::pipeline::state_machine::{AssessmentGuard, ScanStateMachine};
use crate::pipeline::stats::SessionStats;
use crate::pipeline::types::ScanEvent;

/// Operator reset request, consumed by the frame thread on its next frame so
/// that debounce state keeps a single writer.
#[derive(Debug, Default)]
pub struct ResetSignal(AtomicBool);

impl ResetSignal {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Per-frame entry point of a checkpoint session. Runs on the frame thread,
/// never awaits the commit path.
pub struct FrameIngestAdapter {
    decoder: Box<dyn CodeDecoder>,
    debounce: DebounceState,
    machine: Arc<ScanStateMachine>,
    dispatcher: CommitDispatcher,
    stats: Arc<SessionStats>,
    reset: Arc<ResetSignal>,
    annotator: Option<FrameAnnotator>,
}

impl FrameIngestAdapter {
    pub(crate) fn new(
        decoder: Box<dyn CodeDecoder>,
        debounce: DebounceState,
        machine: Arc<ScanStateMachine>,
        dispatcher: CommitDispatcher,
        stats: Arc<SessionStats>,
        reset: Arc<ResetSignal>,
        annotator: Option<FrameAnnotator>,
    ) -> Self {
        Self {
            decoder,
            debounce,
            machine,
            dispatcher,
            stats,
            reset,
            annotator,
        }
    }

    pub fn debounce_state(&self) -> &DebounceState {
        &self.debounce
    }

    /// Returns the frame for display: untouched while a commit is in flight
    /// or nothing is visible, outlined when a code was found.
    pub fn process(&mut self, frame: Frame) -> Frame {
        self.stats.on_frame();

        if self.reset.take() {
            debug!("Clearing debounce state after reset");
            self.debounce.reset();
        }

        if self.machine.is_assessing() {
            self.stats.on_frozen_frame();
            return frame;
        }

        let Some(detection) = self.decoder.decode(&frame) else {
            return frame;
        };
        let now = self.debounce.monotonic(frame.captured_at());
        let event = match ScanEvent::try_new(detection.code_value, detection.code_type, now) {
            Ok(event) => event,
            Err(e) => {
                trace!("Ignoring detection: {}", e);
                self.stats.on_malformed();
                return frame;
            }
        };
        self.stats.on_decoded();

        let output = match (&self.annotator, &detection.bounding_box) {
            (Some(annotator), Some(bounding_box)) => {
                annotator.annotate(&frame, bounding_box, event.code_type.as_str())
            }
            _ => frame,
        };

        if !DebounceGate::accept(&event.code_value, now, &self.debounce) {
            trace!("Suppressed repeat of {}", event.code_value);
            self.stats.on_suppressed();
            return output;
        }

        // Recorded before the assessment runs, whatever its outcome.
        self.debounce.record(&event.code_value, now);
        self.stats.on_accepted();

        match self.machine.try_begin(event) {
            Some(ticket) => {
                debug!("Dispatching {} for commit", ticket.event().code_value);
                self.dispatcher
                    .dispatch(AssessmentGuard::new(self.machine.clone(), ticket));
            }
            None => {
                debug!("Assessment already in flight, dropping detection");
                self.stats.on_dropped_busy();
            }
        }
        output
    }
}
