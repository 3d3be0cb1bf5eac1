use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::AppError;
use crate::gateway::AccessLogGateway;
use crate::pipeline::debounce::DebounceState;
use crate::pipeline::decoder::CodeDecoder;
use crate::pipeline::ingest::{FrameIngestAdapter, ResetSignal};
use crate::pipeline::observer::StatusObserver;
use crate::pipeline::services::{CommitDispatcher, CommitWorker, FrameAnnotator};
use crate::pipeline::state_machine::ScanStateMachine;
use crate::pipeline::stats::{SessionStats, StatsSnapshot};
use crate::pipeline::status_channel::{StatusChannel, StatusReader};
use crate::pipeline::types::ScanStatus;

/// Control and observation handle of one checkpoint. The frame side lives in
/// the `FrameIngestAdapter` returned next to it.
pub struct CheckpointSession {
    id: Uuid,
    machine: Arc<ScanStateMachine>,
    status: StatusChannel,
    stats: Arc<SessionStats>,
    reset: Arc<ResetSignal>,
    gateway: Arc<dyn AccessLogGateway>,
    commit_loop: JoinHandle<()>,
}

impl CheckpointSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> Option<Arc<ScanStatus>> {
        self.status.peek()
    }

    pub fn status_reader(&self) -> StatusReader {
        self.status.reader()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_assessing(&self) -> bool {
        self.machine.is_assessing()
    }

    pub async fn wait_idle(&self) {
        self.machine.wait_idle().await;
    }

    /// Operator "reset / resume": unfreezes the session and forgets the last
    /// code so it can be scanned again right away.
    pub fn reset(&self) {
        info!("Resetting checkpoint session {}", self.id);
        self.machine.reset();
        self.reset.request();
    }

    pub fn observer(&self, recent_limit: usize) -> StatusObserver {
        StatusObserver::new(self.status.reader(), self.gateway.clone(), recent_limit)
    }

    pub fn is_running(&self) -> bool {
        !self.commit_loop.is_finished()
    }
}

impl Drop for CheckpointSession {
    fn drop(&mut self) {
        // An in-flight commit releases its freeze through its guard.
        self.commit_loop.abort();
    }
}

pub struct CheckpointBuilder {
    session_id: Option<Uuid>,
    cooldown: TimeDelta,
    duplicate_window: TimeDelta,
    gateway_timeout: Duration,
    annotate: bool,
    gateway: Option<Arc<dyn AccessLogGateway>>,
    decoder: Option<Box<dyn CodeDecoder>>,
}

impl CheckpointBuilder {
    pub fn new(settings: &Settings) -> Self {
        Self {
            session_id: None,
            cooldown: settings.cooldown(),
            duplicate_window: settings.duplicate_window(),
            gateway_timeout: settings.gateway_timeout(),
            annotate: settings.annotate_frames,
            gateway: None,
            decoder: None,
        }
    }

    pub fn session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    // Overrides the configured cooldown.
    pub fn cooldown(mut self, cooldown: TimeDelta) -> Self {
        self.cooldown = cooldown;
        self
    }

    // Overrides the configured duplicate window.
    pub fn duplicate_window(mut self, duplicate_window: TimeDelta) -> Self {
        self.duplicate_window = duplicate_window;
        self
    }

    // Overrides the configured gateway timeout.
    pub fn gateway_timeout(mut self, gateway_timeout: Duration) -> Self {
        self.gateway_timeout = gateway_timeout;
        self
    }

    pub fn annotate(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn AccessLogGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn decoder(mut self, decoder: Box<dyn CodeDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Spawns the commit loop, so it must run inside a tokio runtime.
    pub fn build(self) -> Result<(CheckpointSession, FrameIngestAdapter), AppError> {
        let gateway = self
            .gateway
            .ok_or(AppError::InvalidConfig("Gateway not set".to_string()))?;
        let decoder = self
            .decoder
            .ok_or(AppError::InvalidConfig("Decoder not set".to_string()))?;
        if self.cooldown <= TimeDelta::zero() {
            return Err(AppError::InvalidConfig(
                "Cooldown must be greater than 0".to_string(),
            ));
        }
        if self.duplicate_window <= TimeDelta::zero() {
            return Err(AppError::InvalidConfig(
                "Duplicate window must be greater than 0".to_string(),
            ));
        }
        if self.gateway_timeout.is_zero() {
            return Err(AppError::InvalidConfig(
                "Gateway timeout must be greater than 0".to_string(),
            ));
        }

        let id = self.session_id.unwrap_or_else(Uuid::new_v4);
        let status = StatusChannel::new();
        let machine = Arc::new(ScanStateMachine::new(status.clone()));
        let stats = Arc::new(SessionStats::new());
        let reset = Arc::new(ResetSignal::default());

        let worker = CommitWorker::new(gateway.clone(), self.duplicate_window);
        let (dispatcher, commit_loop) =
            CommitDispatcher::spawn(worker, stats.clone(), self.gateway_timeout);

        let annotator = self.annotate.then(FrameAnnotator::default);
        let adapter = FrameIngestAdapter::new(
            decoder,
            DebounceState::new(self.cooldown),
            machine.clone(),
            dispatcher,
            stats.clone(),
            reset.clone(),
            annotator,
        );

        info!("Checkpoint session {} ready", id);
        Ok((
            CheckpointSession {
                id,
                machine,
                status,
                stats,
                reset,
                gateway,
                commit_loop,
            },
            adapter,
        ))
    }
}
