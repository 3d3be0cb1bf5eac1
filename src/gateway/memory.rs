use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::GatewayError;
use crate::gateway::{require_code_value, AccessLogGateway, EmployeeDirectory};
use crate::pipeline::types::{EmployeeRecord, LogRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    None,
    Reads,
    Writes,
    All,
}

impl FailureMode {
    fn fails_reads(self) -> bool {
        matches!(self, FailureMode::Reads | FailureMode::All)
    }

    fn fails_writes(self) -> bool {
        matches!(self, FailureMode::Writes | FailureMode::All)
    }
}

/// In-process access log and employee directory with injectable latency and
/// failures.
pub struct MemoryGateway {
    records: RwLock<Vec<LogRecord>>,
    employees: RwLock<Vec<EmployeeRecord>>,
    latency: Mutex<Option<Duration>>,
    failure_mode: Mutex<FailureMode>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            employees: RwLock::new(Vec::new()),
            latency: Mutex::new(None),
            failure_mode: Mutex::new(FailureMode::None),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with_records(records: Vec<LogRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::new()
        }
    }

    pub fn with_employees(self, employees: Vec<EmployeeRecord>) -> Self {
        Self {
            employees: RwLock::new(employees),
            ..self
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(Some(latency));
        self
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    pub fn set_failure_mode(&self, mode: FailureMode) {
        *self
            .failure_mode
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub async fn records(&self) -> Vec<LogRecord> {
        self.records.read().await.clone()
    }

    /// Number of read calls served (including failed ones).
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write calls attempted (including failed ones).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn failure_mode(&self) -> FailureMode {
        *self
            .failure_mode
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessLogGateway for MemoryGateway {
    async fn insert_log(&self, record: LogRecord) -> Result<(), GatewayError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.failure_mode().fails_writes() {
            return Err(GatewayError::Unavailable(
                "simulated write failure".to_string(),
            ));
        }
        self.records.write().await.push(record);
        Ok(())
    }

    async fn query_last(&self, code_value: &str) -> Result<Option<LogRecord>, GatewayError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.failure_mode().fails_reads() {
            return Err(GatewayError::Unavailable(
                "simulated read failure".to_string(),
            ));
        }
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| record.code_value == code_value)
            .max_by_key(|record| record.timestamp)
            .cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, GatewayError> {
        self.simulate_latency().await;
        if self.failure_mode().fails_reads() {
            return Err(GatewayError::Unavailable(
                "simulated read failure".to_string(),
            ));
        }
        let mut records = self.records.read().await.clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryGateway {
    async fn register_employee(&self, employee: EmployeeRecord) -> Result<(), GatewayError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        require_code_value(&employee)?;
        if self.failure_mode().fails_writes() {
            return Err(GatewayError::Unavailable(
                "simulated write failure".to_string(),
            ));
        }
        self.employees.write().await.push(employee);
        Ok(())
    }

    async fn list_employees(&self) -> Result<Vec<EmployeeRecord>, GatewayError> {
        self.simulate_latency().await;
        if self.failure_mode().fails_reads() {
            return Err(GatewayError::Unavailable(
                "simulated read failure".to_string(),
            ));
        }
        let mut employees = self.employees.read().await.clone();
        employees.sort_by(|a, b| {
            (a.employee_name.is_none(), &a.employee_name).cmp(&(b.employee_name.is_none(), &b.employee_name))
        });
        Ok(employees)
    }

    async fn find_employee(&self, code_value: &str) -> Result<Option<EmployeeRecord>, GatewayError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.failure_mode().fails_reads() {
            return Err(GatewayError::Unavailable(
                "simulated read failure".to_string(),
            ));
        }
        let employees = self.employees.read().await;
        Ok(employees
            .iter()
            .find(|employee| employee.code_value == code_value)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::CodeType;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn record(code: &str, secs: i64) -> LogRecord {
        LogRecord {
            code_value: code.to_string(),
            code_type: CodeType::QrCode,
            timestamp: at(secs),
            result: "OK".to_string(),
        }
    }

    #[tokio::test]
    async fn query_last_returns_newest_matching_row() {
        let gateway = MemoryGateway::with_records(vec![
            record("A1", 0),
            record("A1", 30),
            record("B2", 60),
            record("A1", 10),
        ]);
        let last = gateway.query_last("A1").await.unwrap().unwrap();
        assert_eq!(last.timestamp, at(30));
        assert!(gateway.query_last("C3").await.unwrap().is_none());
        assert_eq!(gateway.read_count(), 2);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_bounded() {
        let gateway = MemoryGateway::new();
        for secs in 0..5 {
            gateway.insert_log(record("A1", secs)).await.unwrap();
        }
        let recent = gateway.recent(3).await.unwrap();
        let stamps: Vec<_> = recent.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![at(4), at(3), at(2)]);
    }

    #[tokio::test]
    async fn injected_failures_are_reported() {
        let gateway = MemoryGateway::new();
        gateway.set_failure_mode(FailureMode::Writes);
        assert!(matches!(
            gateway.insert_log(record("A1", 0)).await,
            Err(GatewayError::Unavailable(_))
        ));
        assert!(gateway.query_last("A1").await.is_ok());

        gateway.set_failure_mode(FailureMode::Reads);
        assert!(gateway.query_last("A1").await.is_err());
        assert!(gateway.recent(10).await.is_err());
        assert!(gateway.records().await.is_empty());
        assert_eq!(gateway.write_count(), 1);
    }

    #[tokio::test]
    async fn employees_are_listed_by_name() {
        let gateway = MemoryGateway::new();
        gateway
            .register_employee(EmployeeRecord::new("EMP-0003", "Citra"))
            .await
            .unwrap();
        gateway
            .register_employee(EmployeeRecord {
                code_value: "EMP-0009".to_string(),
                employee_name: None,
                department: None,
                company: None,
            })
            .await
            .unwrap();
        gateway
            .register_employee(EmployeeRecord::new("EMP-0001", "Ana").company("Offshore Ops"))
            .await
            .unwrap();

        let codes: Vec<_> = gateway
            .list_employees()
            .await
            .unwrap()
            .into_iter()
            .map(|employee| employee.code_value)
            .collect();
        assert_eq!(codes, vec!["EMP-0001", "EMP-0003", "EMP-0009"]);
        let found = gateway.find_employee("EMP-0003").await.unwrap().unwrap();
        assert_eq!(found.display_name(), "Citra");
        assert!(gateway.find_employee("EMP-0404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn employees_need_a_code_value() {
        let gateway = MemoryGateway::new();
        let result = gateway
            .register_employee(EmployeeRecord::new("  ", "Nobody"))
            .await;
        assert_eq!(
            result,
            Err(GatewayError::Rejected("Code value is required".to_string()))
        );
        assert!(gateway.list_employees().await.unwrap().is_empty());
    }
}
