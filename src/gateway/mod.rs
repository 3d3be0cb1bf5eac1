pub mod memory;
pub mod postgrest;

pub use memory::{FailureMode, MemoryGateway};
pub use postgrest::PostgrestGateway;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{GatewayKind, Settings};
use crate::error::{AppError, GatewayError};
use crate::pipeline::types::{EmployeeRecord, LogRecord};

/// Durable access log. Implementations may be slow and may fail; callers on
/// the commit path convert every error into a commit result.
#[async_trait]
pub trait AccessLogGateway: Send + Sync {
    async fn insert_log(&self, record: LogRecord) -> Result<(), GatewayError>;

    /// Most recent row for `code_value`, by timestamp.
    async fn query_last(&self, code_value: &str) -> Result<Option<LogRecord>, GatewayError>;

    /// Newest rows first, at most `limit` of them.
    async fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, GatewayError>;
}

/// Master data mapping badge codes to people.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Fails with `Rejected` when the code value is blank.
    async fn register_employee(&self, employee: EmployeeRecord) -> Result<(), GatewayError>;

    /// All employees ordered by name, unnamed entries last.
    async fn list_employees(&self) -> Result<Vec<EmployeeRecord>, GatewayError>;

    async fn find_employee(&self, code_value: &str) -> Result<Option<EmployeeRecord>, GatewayError>;
}

/// The stores one checkpoint talks to, usually the same backend twice.
#[derive(Clone)]
pub struct Backends {
    pub access_log: Arc<dyn AccessLogGateway>,
    pub directory: Arc<dyn EmployeeDirectory>,
}

pub(crate) fn require_code_value(employee: &EmployeeRecord) -> Result<(), GatewayError> {
    if employee.code_value.trim().is_empty() {
        return Err(GatewayError::Rejected("Code value is required".to_string()));
    }
    Ok(())
}

pub fn from_settings(settings: &Settings) -> Result<Backends, AppError> {
    match settings.gateway.kind {
        GatewayKind::Memory => {
            let gateway = Arc::new(MemoryGateway::new().with_employees(settings.demo.employees.clone()));
            Ok(Backends {
                access_log: gateway.clone(),
                directory: gateway,
            })
        }
        GatewayKind::Postgrest => {
            let url = settings.gateway.url.as_deref().ok_or_else(|| {
                AppError::InvalidConfig("PostgREST gateway requires gateway.url".to_string())
            })?;
            let gateway = Arc::new(
                PostgrestGateway::new(
                    url,
                    &settings.gateway.table,
                    settings.gateway.api_key.clone(),
                    settings.gateway_timeout(),
                )?
                .with_employee_table(&settings.gateway.employee_table),
            );
            Ok(Backends {
                access_log: gateway.clone(),
                directory: gateway,
            })
        }
    }
}
