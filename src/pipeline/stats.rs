use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::pipeline::types::{CommitOutcome, CommitResult};

/// Counters shared by the frame thread and the commit loop of one session.
#[derive(Debug, Default)]
pub struct SessionStats {
    frames: AtomicU64,
    frozen_frames: AtomicU64,
    decoded: AtomicU64,
    malformed: AtomicU64,
    suppressed: AtomicU64,
    accepted: AtomicU64,
    dropped_busy: AtomicU64,
    logged: AtomicU64,
    denied: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub frames: u64,
    pub frozen_frames: u64,
    pub decoded: u64,
    pub malformed: u64,
    pub suppressed: u64,
    pub accepted: u64,
    pub dropped_busy: u64,
    pub logged: u64,
    pub denied: u64,
    pub failed: u64,
}

impl StatsSnapshot {
    pub fn commits(&self) -> u64 {
        self.logged + self.denied + self.failed
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_frozen_frame(&self) {
        self.frozen_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_dropped_busy(&self) {
        self.dropped_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_commit(&self, result: &CommitResult) {
        let counter = match result.outcome {
            CommitOutcome::Logged => &self.logged,
            CommitOutcome::DuplicateDenied => &self.denied,
            CommitOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            frozen_frames: self.frozen_frames.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            logged: self.logged.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{CodeType, ScanEvent};
    use chrono::Utc;

    #[test]
    fn commit_outcomes_land_in_their_counters() {
        let stats = SessionStats::new();
        let event = ScanEvent::new("A1", CodeType::QrCode, Utc::now());
        stats.on_commit(&CommitResult::logged(event.clone()));
        stats.on_commit(&CommitResult::duplicate(event.clone()));
        stats.on_commit(&CommitResult::failed(event, "boom"));
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.logged, 1);
        assert_eq!(snapshot.denied, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.commits(), 3);
    }
}
