use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

use crate::camera::{SceneDecoder, SimulatedScene, SyntheticCamera};
use crate::common::Frame;
use crate::config::Settings;
use crate::error::AppError;
use crate::gateway::{AccessLogGateway, EmployeeDirectory};
use crate::pipeline::{
    CheckpointBuilder, CheckpointSession, FrameIngestAdapter, FramePublishingService, StatusObserver,
};

/// Runs one checkpoint end to end: camera thread, frame thread, commit loop
/// and a periodic observer.
pub struct Coordinator {
    session: Arc<CheckpointSession>,
    camera: SyntheticCamera,
    frame_thread: Option<std::thread::JoinHandle<()>>,
    observer_task: tokio::task::JoinHandle<()>,
    publisher: FramePublishingService,
    directory: Option<Arc<dyn EmployeeDirectory>>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    fn new(
        settings: Settings,
        session: CheckpointSession,
        adapter: FrameIngestAdapter,
        scene: Arc<SimulatedScene>,
        directory: Option<Arc<dyn EmployeeDirectory>>,
    ) -> Result<Self, AppError> {
        let cancel_token = CancellationToken::new();
        let session = Arc::new(session);
        let (publisher, _display_rx) = FramePublishingService::new();
        let (frame_tx, frame_rx) = tokio::sync::mpsc::channel(settings.frame_buffer_size);

        let frame_thread = Self::start_frame_thread(adapter, frame_rx, publisher.clone())?;
        let mut observer = session.observer(settings.observer.recent_limit);
        if let Some(directory) = &directory {
            observer = observer.with_directory(directory.clone());
        }
        let observer_task = Self::start_observer_task(
            session.clone(),
            observer,
            Duration::from_millis(settings.observer.poll_interval_ms),
            cancel_token.clone(),
        );
        let camera = SyntheticCamera::start(session.id(), scene, frame_tx, &settings.demo);

        Ok(Self {
            session,
            camera,
            frame_thread: Some(frame_thread),
            observer_task,
            publisher,
            directory,
            cancel_token,
        })
    }

    fn start_frame_thread(
        mut adapter: FrameIngestAdapter,
        mut frame_rx: Receiver<Frame>,
        publisher: FramePublishingService,
    ) -> Result<std::thread::JoinHandle<()>, AppError> {
        std::thread::Builder::new()
            .name("scangate-frames".to_string())
            .spawn(move || {
                while let Some(frame) = frame_rx.blocking_recv() {
                    publisher.publish(adapter.process(frame));
                }
                tracing::debug!("Frame thread finished");
            })
            .map_err(|e| AppError::Camera(format!("Failed to start frame thread: {}", e)))
    }

    fn start_observer_task(
        session: Arc<CheckpointSession>,
        observer: StatusObserver,
        poll_interval: Duration,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let snapshot = observer.snapshot().await;
                        let mut status = snapshot
                            .status
                            .as_ref()
                            .map(|status| status.message())
                            .unwrap_or_else(|| "Waiting for scan".to_string());
                        if let Some(employee) = &snapshot.employee {
                            status = format!("{} ({})", status, employee.display_name());
                        }
                        let stats = serde_json::to_string(&session.stats()).unwrap_or_default();
                        match snapshot.load_error {
                            Some(err) => tracing::warn!("{} | {}", status, err),
                            None => tracing::info!(
                                "{} | {} recent entries | {}",
                                status,
                                snapshot.recent.len(),
                                stats
                            ),
                        }
                    }
                }
            }
        })
    }

    pub fn session(&self) -> &CheckpointSession {
        &self.session
    }

    /// Employee master data, for registering badges while the checkpoint runs.
    pub fn directory(&self) -> Option<&Arc<dyn EmployeeDirectory>> {
        self.directory.as_ref()
    }

    /// Annotated frames for a display.
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.publisher.subscribe()
    }

    pub fn reset(&self) {
        self.session.reset();
    }

    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        // Stopping the camera closes the frame channel, which ends the frame thread.
        self.camera.stop();
        if let Some(thread) = self.frame_thread.take() {
            if thread.join().is_err() {
                tracing::error!("Frame thread panicked");
            }
        }
        self.observer_task.abort();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    settings: Settings,
    gateway: Option<Arc<dyn AccessLogGateway>>,
    directory: Option<Arc<dyn EmployeeDirectory>>,
}

impl CoordinatorBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            gateway: None,
            directory: None,
        }
    }

    // Adjusts the frame buffer size, this will override the default configuration.
    pub fn frame_buffer_size(mut self, frame_buffer_size: usize) -> Self {
        self.settings.frame_buffer_size = frame_buffer_size;
        self
    }

    // Sets the camera frame interval, this will override the default configuration.
    pub fn frame_interval_ms(mut self, frame_interval_ms: u64) -> Self {
        self.settings.demo.frame_interval_ms = frame_interval_ms;
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn AccessLogGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn EmployeeDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.settings.validate()?;
        // An injected gateway only gets a directory if one is injected too.
        let (gateway, directory) = match self.gateway {
            Some(gateway) => (gateway, self.directory),
            None => {
                let backends = crate::gateway::from_settings(&self.settings)?;
                (
                    backends.access_log,
                    Some(self.directory.unwrap_or(backends.directory)),
                )
            }
        };
        let scene = Arc::new(SimulatedScene::new(
            self.settings.demo.script.clone(),
            Utc::now(),
        ));
        let (session, adapter) = CheckpointBuilder::new(&self.settings)
            .gateway(gateway)
            .decoder(Box::new(SceneDecoder::new(scene.clone())))
            .build()?;
        Coordinator::new(self.settings, session, adapter, scene, directory)
    }
}
