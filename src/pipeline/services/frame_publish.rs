use std::convert::Infallible;
use std::task::{Context, Poll};

use futures::future::{ready, Ready};
use tokio::sync::broadcast;
use tower::Service;

use crate::common::Frame;

pub const DISPLAY_BUFFER: usize = 10;

/// Fans processed frames out to display subscribers. Slow subscribers lag and
/// skip frames; publishing never waits on them.
#[derive(Clone)]
pub struct FramePublishingService {
    display_tx: broadcast::Sender<Frame>,
}

impl FramePublishingService {
    pub fn new() -> (Self, broadcast::Receiver<Frame>) {
        let (display_tx, display_rx) = broadcast::channel(DISPLAY_BUFFER);
        (Self { display_tx }, display_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.display_tx.subscribe()
    }

    /// Number of subscribers that received the frame.
    pub fn publish(&self, frame: Frame) -> usize {
        self.display_tx.send(frame).unwrap_or(0)
    }
}

impl Service<Frame> for FramePublishingService {
    type Response = usize;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, frame: Frame) -> Self::Future {
        ready(Ok(self.publish(frame)))
    }
}
