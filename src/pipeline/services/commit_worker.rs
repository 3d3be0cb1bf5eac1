use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::TimeDelta;
use tower::Service;
use tracing::{error, info, instrument, warn};

use crate::error::GatewayError;
use crate::gateway::AccessLogGateway;
use crate::pipeline::types::{CommitResult, LogRecord, ScanEvent};

enum Verdict {
    Logged,
    Duplicate(TimeDelta),
}

/// Duplicate-window check plus insert for one accepted scan. Never fails:
/// gateway errors come back as a negative `CommitResult`.
#[derive(Clone)]
pub struct CommitWorker {
    gateway: Arc<dyn AccessLogGateway>,
    duplicate_window: TimeDelta,
}

impl CommitWorker {
    pub fn new(gateway: Arc<dyn AccessLogGateway>, duplicate_window: TimeDelta) -> Self {
        Self {
            gateway,
            duplicate_window,
        }
    }

    pub fn duplicate_window(&self) -> TimeDelta {
        self.duplicate_window
    }

    #[instrument(skip(self, event), fields(code = %event.code_value))]
    pub async fn run(&self, event: ScanEvent) -> CommitResult {
        match self.commit(&event).await {
            Ok(Verdict::Logged) => {
                info!("Logged access for {}", event.code_value);
                CommitResult::logged(event)
            }
            Ok(Verdict::Duplicate(elapsed)) => {
                warn!(
                    "Denied {}: last entry {}ms ago is inside the duplicate window",
                    event.code_value,
                    elapsed.num_milliseconds()
                );
                CommitResult::duplicate(event)
            }
            Err(e) => {
                error!("Commit for {} failed: {}", event.code_value, e);
                CommitResult::failed(event, e.to_string())
            }
        }
    }

    // One read, at most one write.
    async fn commit(&self, event: &ScanEvent) -> Result<Verdict, GatewayError> {
        if let Some(last) = self.gateway.query_last(&event.code_value).await? {
            let elapsed = event.detected_at - last.timestamp;
            if elapsed < self.duplicate_window {
                return Ok(Verdict::Duplicate(elapsed));
            }
        }
        self.gateway.insert_log(LogRecord::accepted(event)).await?;
        Ok(Verdict::Logged)
    }
}

impl Service<ScanEvent> for CommitWorker {
    type Response = CommitResult;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: ScanEvent) -> Self::Future {
        let worker = self.clone();
        Box::pin(async move { Ok(worker.run(event).await) })
    }
}
