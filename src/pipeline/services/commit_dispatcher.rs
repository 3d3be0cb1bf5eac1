use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tower::timeout::error::Elapsed;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};
use tracing::{debug, error, warn};

use crate::pipeline::state_machine::AssessmentGuard;
use crate::pipeline::stats::SessionStats;
use crate::pipeline::types::{CommitResult, ScanEvent};

/// The state machine already allows one in-flight event per session, so one
/// slot is enough. A full queue is rejected, never waited on.
pub const COMMIT_QUEUE_DEPTH: usize = 1;

/// Frame-thread side of the commit loop. Cloneable, never blocks.
#[derive(Clone)]
pub struct CommitDispatcher {
    tx: mpsc::Sender<AssessmentGuard>,
    stats: Arc<SessionStats>,
}

impl CommitDispatcher {
    /// Spawns the commit loop on the current tokio runtime. Every call to
    /// `service` is bounded by `timeout`.
    pub fn spawn<S>(service: S, stats: Arc<SessionStats>, timeout: Duration) -> (Self, JoinHandle<()>)
    where
        S: Service<ScanEvent, Response = CommitResult, Error = Infallible> + Send + 'static,
        S::Future: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(COMMIT_QUEUE_DEPTH);
        let service = ServiceBuilder::new().timeout(timeout).service(service);
        let handle = tokio::spawn(run_commit_loop(rx, service, stats.clone(), timeout));
        (Self { tx, stats }, handle)
    }

    /// Hands the assessment to the commit loop. If it cannot be queued the
    /// freeze is released right away with a failure result.
    pub fn dispatch(&self, guard: AssessmentGuard) {
        match self.tx.try_send(guard) {
            Ok(()) => {}
            Err(TrySendError::Full(guard)) => {
                warn!("Commit queue full, rejecting {}", guard.event().code_value);
                self.reject(guard, "commit queue full");
            }
            Err(TrySendError::Closed(guard)) => {
                error!(
                    "Commit loop is gone, rejecting {}",
                    guard.event().code_value
                );
                self.reject(guard, "commit worker stopped");
            }
        }
    }

    fn reject(&self, guard: AssessmentGuard, reason: &str) {
        let result = CommitResult::failed(guard.event().clone(), reason);
        self.stats.on_commit(&result);
        guard.release(result);
    }
}

async fn run_commit_loop<S>(
    mut rx: mpsc::Receiver<AssessmentGuard>,
    mut service: S,
    stats: Arc<SessionStats>,
    timeout: Duration,
) where
    S: Service<ScanEvent, Response = CommitResult, Error = BoxError> + Send + 'static,
    S::Future: Send + 'static,
{
    while let Some(guard) = rx.recv().await {
        let event = guard.event().clone();
        let result = match service.ready().await {
            Ok(ready) => {
                // Each commit runs in its own task so a panic surfaces as a JoinError.
                let call = ready.call(event.clone());
                match tokio::spawn(call).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(err)) if err.is::<Elapsed>() => {
                        error!(
                            "Commit for {} timed out after {}ms",
                            event.code_value,
                            timeout.as_millis()
                        );
                        CommitResult::failed(
                            event,
                            format!("gateway timed out after {}ms", timeout.as_millis()),
                        )
                    }
                    Ok(Err(err)) => CommitResult::failed(event, err.to_string()),
                    Err(join_err) => {
                        error!("Commit task for {} died: {}", event.code_value, join_err);
                        CommitResult::failed(event, "commit worker panicked")
                    }
                }
            }
            Err(err) => CommitResult::failed(event, err.to_string()),
        };
        stats.on_commit(&result);
        guard.release(result);
    }
    debug!("Commit loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::pipeline::services::CommitWorker;
    use crate::pipeline::state_machine::ScanStateMachine;
    use crate::pipeline::status_channel::StatusChannel;
    use crate::pipeline::types::{CodeType, CommitOutcome, ScanStatus};
    use chrono::{TimeDelta, Utc};
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn event(code: &str) -> ScanEvent {
        ScanEvent::new(code, CodeType::QrCode, Utc::now())
    }

    fn session() -> (Arc<ScanStateMachine>, StatusChannel) {
        let status = StatusChannel::new();
        (Arc::new(ScanStateMachine::new(status.clone())), status)
    }

    fn begin(machine: &Arc<ScanStateMachine>, code: &str) -> AssessmentGuard {
        let ticket = machine.try_begin(event(code)).unwrap();
        AssessmentGuard::new(machine.clone(), ticket)
    }

    fn finished(status: &StatusChannel) -> CommitResult {
        match &*status.peek().unwrap() {
            ScanStatus::Finished(result) => result.clone(),
            other => panic!("still {:?}", other),
        }
    }

    #[derive(Clone)]
    struct PanickingService;

    impl Service<ScanEvent> for PanickingService {
        type Response = CommitResult;
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _event: ScanEvent) -> Self::Future {
            Box::pin(async move {
                let result: Result<CommitResult, Infallible> = panic!("gateway client exploded");
                result
            })
        }
    }

    #[tokio::test]
    async fn commit_releases_freeze_and_publishes() {
        let gateway = Arc::new(MemoryGateway::new());
        let stats = Arc::new(SessionStats::new());
        let worker = CommitWorker::new(gateway.clone(), TimeDelta::seconds(10));
        let (dispatcher, _loop) = CommitDispatcher::spawn(worker, stats.clone(), Duration::from_secs(1));
        let (machine, status) = session();

        dispatcher.dispatch(begin(&machine, "A1"));
        machine.wait_idle().await;

        assert_eq!(finished(&status).message, "OK: A1");
        assert_eq!(gateway.records().await.len(), 1);
        assert_eq!(stats.snapshot().logged, 1);
    }

    #[tokio::test]
    async fn timeout_is_a_failure_and_releases_freeze() {
        let gateway = Arc::new(MemoryGateway::new().with_latency(Duration::from_millis(500)));
        let stats = Arc::new(SessionStats::new());
        let worker = CommitWorker::new(gateway, TimeDelta::seconds(10));
        let (dispatcher, _loop) =
            CommitDispatcher::spawn(worker, stats.clone(), Duration::from_millis(20));
        let (machine, status) = session();

        dispatcher.dispatch(begin(&machine, "A1"));
        machine.wait_idle().await;

        let result = finished(&status);
        assert!(!result.ok);
        assert_eq!(result.message, "gateway timed out after 20ms");
        assert_eq!(stats.snapshot().failed, 1);
    }

    #[tokio::test]
    async fn panicking_commit_still_releases_freeze() {
        let stats = Arc::new(SessionStats::new());
        let (dispatcher, commit_loop) =
            CommitDispatcher::spawn(PanickingService, stats.clone(), Duration::from_secs(1));
        let (machine, status) = session();

        dispatcher.dispatch(begin(&machine, "A1"));
        machine.wait_idle().await;

        assert_eq!(finished(&status).message, "commit worker panicked");

        // The loop survives and serves the next scan.
        dispatcher.dispatch(begin(&machine, "B2"));
        machine.wait_idle().await;
        assert_eq!(stats.snapshot().failed, 2);
        assert!(!commit_loop.is_finished());
    }

    #[tokio::test]
    async fn full_queue_rejects_immediately() {
        let gateway = Arc::new(MemoryGateway::new().with_latency(Duration::from_millis(200)));
        let stats = Arc::new(SessionStats::new());
        let worker = CommitWorker::new(gateway, TimeDelta::seconds(10));
        let (dispatcher, _loop) = CommitDispatcher::spawn(worker, stats.clone(), Duration::from_secs(5));

        let (first, _) = session();
        let (second, _) = session();
        let (third, third_status) = session();

        dispatcher.dispatch(begin(&first, "A1"));
        // Let the loop pick up the first job so the slot frees up.
        tokio::time::sleep(Duration::from_millis(50)).await;
        dispatcher.dispatch(begin(&second, "B2"));
        dispatcher.dispatch(begin(&third, "C3"));

        assert!(!third.is_assessing());
        let rejected = finished(&third_status);
        assert_eq!(rejected.message, "commit queue full");
        assert!(matches!(rejected.outcome, CommitOutcome::Failed(_)));

        first.wait_idle().await;
        second.wait_idle().await;
        assert_eq!(stats.snapshot().logged, 2);
    }

    #[tokio::test]
    async fn stopped_loop_rejects_dispatch() {
        let stats = Arc::new(SessionStats::new());
        let worker = CommitWorker::new(Arc::new(MemoryGateway::new()), TimeDelta::seconds(10));
        let (dispatcher, commit_loop) = CommitDispatcher::spawn(worker, stats, Duration::from_secs(1));
        commit_loop.abort();
        let _ = commit_loop.await;

        let (machine, status) = session();
        dispatcher.dispatch(begin(&machine, "A1"));
        assert!(!machine.is_assessing());
        assert_eq!(finished(&status).message, "commit worker stopped");
    }
}
