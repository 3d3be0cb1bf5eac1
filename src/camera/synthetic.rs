use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use image::{DynamicImage, Rgb, RgbImage};
use rand::Rng;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::camera::scene::{SimulatedScene, CARD_RECT};
use crate::common::Frame;
use crate::config::DemoSettings;

pub const FRAME_WIDTH: u32 = 320;
pub const FRAME_HEIGHT: u32 = 240;

/// Camera stand-in running on its own thread. Frames are pushed with
/// `try_send`; when the consumer falls behind they are dropped.
pub struct SyntheticCamera {
    id: Uuid,
    cancel_token: CancellationToken,
    camera_thread: Option<std::thread::JoinHandle<()>>,
}

impl SyntheticCamera {
    pub fn start(
        session_id: Uuid,
        scene: Arc<SimulatedScene>,
        frame_tx: Sender<Frame>,
        settings: &DemoSettings,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let mut camera = CameraLoop {
            session_id,
            scene,
            frame_tx,
            interval: Duration::from_millis(settings.frame_interval_ms),
            jitter_ms: settings.frame_jitter_ms,
            dropped: 0,
        };
        let token = cancel_token.clone();
        Self {
            id: session_id,
            cancel_token,
            camera_thread: Some(std::thread::spawn(move || camera.run(token))),
        }
    }

    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(thread) = self.camera_thread.take() {
            if thread.join().is_err() {
                tracing::error!("Camera thread for {} panicked", self.id);
            }
        }
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CameraLoop {
    session_id: Uuid,
    scene: Arc<SimulatedScene>,
    frame_tx: Sender<Frame>,
    interval: Duration,
    jitter_ms: u64,
    dropped: u64,
}

impl CameraLoop {
    fn render(&self, code_visible: bool) -> DynamicImage {
        let mut image = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgb([90, 90, 90]));
        if code_visible {
            let (x, y, width, height) = CARD_RECT;
            for px in x..x + width {
                for py in y..y + height {
                    let (px, py) = (px as u32, py as u32);
                    if px < FRAME_WIDTH && py < FRAME_HEIGHT {
                        let shade = if (px / 8 + py / 8) % 2 == 0 { 0 } else { 255 };
                        image.put_pixel(px, py, Rgb([shade, shade, shade]));
                    }
                }
            }
        }
        DynamicImage::ImageRgb8(image)
    }

    fn next_delay(&self) -> Duration {
        if self.jitter_ms == 0 {
            return self.interval;
        }
        let jitter = rand::rng().random_range(0..=self.jitter_ms);
        self.interval + Duration::from_millis(jitter)
    }

    /// Returns false once the consumer is gone.
    fn capture(&mut self) -> bool {
        let captured_at = Utc::now();
        let image = self.render(self.scene.code_at(captured_at).is_some());
        match self
            .frame_tx
            .try_send(Frame::new(self.session_id, image, captured_at))
        {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                tracing::trace!("Dropping frame: channel full");
                true
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Frame channel closed, stopping camera loop");
                false
            }
        }
    }

    fn run(&mut self, cancel_token: CancellationToken) {
        tracing::info!("Camera started for session {}", self.session_id);
        while !cancel_token.is_cancelled() && self.capture() {
            std::thread::sleep(self.next_delay());
        }
        tracing::info!(
            "Camera stopped for session {} ({} frames dropped)",
            self.session_id,
            self.dropped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneStep;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn frames_flow_until_stopped() {
        let scene = Arc::new(SimulatedScene::new(
            vec![SceneStep {
                code: Some("A1".to_string()),
                duration_ms: 1_000,
            }],
            Utc::now(),
        ));
        let settings = DemoSettings {
            frame_interval_ms: 5,
            frame_jitter_ms: 2,
            script: Vec::new(),
            employees: Vec::new(),
        };
        let (frame_tx, mut frame_rx) = mpsc::channel(4);
        let session_id = Uuid::new_v4();
        let mut camera = SyntheticCamera::start(session_id, scene, frame_tx, &settings);

        let first = frame_rx.recv().await.unwrap();
        let second = frame_rx.recv().await.unwrap();
        assert_eq!(first.session_id(), session_id);
        assert!(second.captured_at() >= first.captured_at());
        assert_eq!(first.image().width(), FRAME_WIDTH);

        camera.stop();
        // The sender went away with the thread.
        while frame_rx.recv().await.is_some() {}
    }
}
