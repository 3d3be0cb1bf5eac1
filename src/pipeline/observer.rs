use std::sync::Arc;

use tracing::warn;

use crate::gateway::{AccessLogGateway, EmployeeDirectory};
use crate::pipeline::status_channel::StatusReader;
use crate::pipeline::types::{EmployeeRecord, LogRecord, ScanStatus};

/// What a dashboard shows on one tick.
#[derive(Debug, Clone)]
pub struct ObserverSnapshot {
    pub status: Option<Arc<ScanStatus>>,
    pub recent: Vec<LogRecord>,
    pub load_error: Option<String>,
    /// Owner of the code in `status`, when a directory is attached and knows it.
    pub employee: Option<EmployeeRecord>,
}

/// Polling reader of a checkpoint: latest status plus the newest log rows.
/// Nothing is pushed to it; it reads at its own cadence.
#[derive(Clone)]
pub struct StatusObserver {
    status: StatusReader,
    gateway: Arc<dyn AccessLogGateway>,
    directory: Option<Arc<dyn EmployeeDirectory>>,
    recent_limit: usize,
}

impl StatusObserver {
    pub fn new(status: StatusReader, gateway: Arc<dyn AccessLogGateway>, recent_limit: usize) -> Self {
        Self {
            status,
            gateway,
            directory: None,
            recent_limit,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn EmployeeDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn status(&self) -> Option<Arc<ScanStatus>> {
        self.status.peek()
    }

    pub async fn snapshot(&self) -> ObserverSnapshot {
        let status = self.status.peek();
        let employee = match &status {
            Some(status) => self.resolve(&status.event().code_value).await,
            None => None,
        };
        match self.gateway.recent(self.recent_limit).await {
            Ok(recent) => ObserverSnapshot {
                status,
                recent,
                load_error: None,
                employee,
            },
            Err(e) => {
                warn!("Failed to load access log: {}", e);
                ObserverSnapshot {
                    status,
                    recent: Vec::new(),
                    load_error: Some(format!("Failed to load data: {}", e)),
                    employee,
                }
            }
        }
    }

    // A failed lookup only costs the name on the status line.
    async fn resolve(&self, code_value: &str) -> Option<EmployeeRecord> {
        let directory = self.directory.as_ref()?;
        match directory.find_employee(code_value).await {
            Ok(employee) => employee,
            Err(e) => {
                warn!("Failed to look up employee {}: {}", code_value, e);
                None
            }
        }
    }
}
