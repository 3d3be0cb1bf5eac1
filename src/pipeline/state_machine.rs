use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::pipeline::status_channel::StatusChannel;
use crate::pipeline::types::{CommitResult, ScanEvent, ScanStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Assessing,
}

#[derive(Debug)]
struct PipelineState {
    phase: Phase,
    current_event: Option<ScanEvent>,
    // Bumped on every begin and reset; identifies the holder of an assessment.
    generation: u64,
}

/// Proof of holding the current assessment. Only the matching ticket can
/// move the session back to idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentTicket {
    generation: u64,
    event: ScanEvent,
}

impl AssessmentTicket {
    pub fn event(&self) -> &ScanEvent {
        &self.event
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Per-session IDLE/ASSESSING arbitration between the frame thread and the
/// commit worker. All transitions go through the mutex.
pub struct ScanStateMachine {
    state: Mutex<PipelineState>,
    status: StatusChannel,
    idle: Notify,
}

impl ScanStateMachine {
    pub fn new(status: StatusChannel) -> Self {
        Self {
            state: Mutex::new(PipelineState {
                phase: Phase::Idle,
                current_event: None,
                generation: 0,
            }),
            status,
            idle: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn is_assessing(&self) -> bool {
        self.phase() == Phase::Assessing
    }

    pub fn current_event(&self) -> Option<ScanEvent> {
        self.lock().current_event.clone()
    }

    /// Atomic check-and-set IDLE -> ASSESSING. `None` means another
    /// assessment is in flight and nothing changed.
    pub fn try_begin(&self, event: ScanEvent) -> Option<AssessmentTicket> {
        let mut state = self.lock();
        if state.phase == Phase::Assessing {
            return None;
        }
        state.generation += 1;
        state.phase = Phase::Assessing;
        state.current_event = Some(event.clone());
        // Published under the lock so a late completion can never overwrite it.
        self.status.publish(ScanStatus::Assessing(event.clone()));
        debug!(
            "Assessment {} started for {}",
            state.generation, event.code_value
        );
        Some(AssessmentTicket {
            generation: state.generation,
            event,
        })
    }

    /// ASSESSING -> IDLE for the holder of `ticket`, publishing `result`.
    /// Repeated or stale calls are no-ops and publish nothing.
    pub fn complete(&self, ticket: &AssessmentTicket, result: CommitResult) -> bool {
        {
            let mut state = self.lock();
            if state.phase != Phase::Assessing || state.generation != ticket.generation {
                debug!(
                    "Ignoring completion of assessment {} (current {}, {:?})",
                    ticket.generation, state.generation, state.phase
                );
                return false;
            }
            state.phase = Phase::Idle;
            state.current_event = None;
            self.status.publish(ScanStatus::Finished(result));
        }
        self.idle.notify_waiters();
        true
    }

    /// Operator reset: back to IDLE, status cleared, outstanding tickets invalidated.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            if let Some(event) = state.current_event.take() {
                warn!(
                    "Resetting session while {} is still being assessed",
                    event.code_value
                );
            }
            state.generation += 1;
            state.phase = Phase::Idle;
            self.status.clear();
        }
        self.idle.notify_waiters();
    }

    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if !self.is_assessing() {
                return;
            }
            notified.await;
        }
    }
}

/// Releases the freeze exactly once: explicitly through `release`, or with a
/// failure result when dropped (panic, cancellation, early return).
pub struct AssessmentGuard {
    machine: Arc<ScanStateMachine>,
    ticket: AssessmentTicket,
    released: bool,
}

impl AssessmentGuard {
    pub fn new(machine: Arc<ScanStateMachine>, ticket: AssessmentTicket) -> Self {
        Self {
            machine,
            ticket,
            released: false,
        }
    }

    pub fn event(&self) -> &ScanEvent {
        self.ticket.event()
    }

    pub fn release(mut self, result: CommitResult) -> bool {
        self.released = true;
        self.machine.complete(&self.ticket, result)
    }
}

impl Drop for AssessmentGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            "Assessment of {} abandoned, releasing freeze",
            self.ticket.event.code_value
        );
        let result = CommitResult::failed(
            self.ticket.event.clone(),
            "commit abandoned before completion",
        );
        self.machine.complete(&self.ticket, result);
    }
}
