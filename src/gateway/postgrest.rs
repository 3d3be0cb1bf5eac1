use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::GatewayError;
use crate::gateway::{require_code_value, AccessLogGateway, EmployeeDirectory};
use crate::pipeline::types::{EmployeeRecord, LogRecord};

const EMPLOYEE_TABLE: &str = "employee_master";

/// Access log and employee directory stored in PostgREST-fronted tables
/// (e.g. a Supabase project).
pub struct PostgrestGateway {
    client: reqwest::Client,
    base_url: String,
    endpoint: String,
    employee_endpoint: String,
    api_key: Option<String>,
}

impl PostgrestGateway {
    pub fn new(
        base_url: &str,
        table: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            endpoint: table_endpoint(base_url, table),
            employee_endpoint: table_endpoint(base_url, EMPLOYEE_TABLE),
            api_key,
        })
    }

    pub fn with_employee_table(mut self, table: &str) -> Self {
        self.employee_endpoint = table_endpoint(&self.base_url, table);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn employee_endpoint(&self) -> &str {
        &self.employee_endpoint
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }

    async fn fetch<T: DeserializeOwned + Send>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, GatewayError> {
        let response = self.request(Method::GET, url).query(query).send().await?;
        let response = check_status(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn insert<T: serde::Serialize + Sync>(&self, url: &str, row: &T) -> Result<(), GatewayError> {
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

fn table_endpoint(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table)
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, body))
}

fn classify_status(status: StatusCode, body: String) -> GatewayError {
    match status {
        StatusCode::CONFLICT | StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Rejected(format!("HTTP {}: {}", status.as_u16(), body))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::Timeout,
        _ => GatewayError::Unavailable(format!("HTTP {}: {}", status.as_u16(), body)),
    }
}

#[async_trait]
impl AccessLogGateway for PostgrestGateway {
    async fn insert_log(&self, record: LogRecord) -> Result<(), GatewayError> {
        debug!("Inserting {} into {}", record.code_value, self.endpoint);
        self.insert(&self.endpoint, &record).await
    }

    async fn query_last(&self, code_value: &str) -> Result<Option<LogRecord>, GatewayError> {
        let rows = self
            .fetch(
                &self.endpoint,
                &[
                    ("code_value", format!("eq.{}", code_value)),
                    ("order", "timestamp.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LogRecord>, GatewayError> {
        self.fetch(
            &self.endpoint,
            &[
                ("select", "*".to_string()),
                ("order", "timestamp.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }
}

#[async_trait]
impl EmployeeDirectory for PostgrestGateway {
    async fn register_employee(&self, employee: EmployeeRecord) -> Result<(), GatewayError> {
        require_code_value(&employee)?;
        debug!("Registering {} in {}", employee.code_value, self.employee_endpoint);
        self.insert(&self.employee_endpoint, &employee).await
    }

    async fn list_employees(&self) -> Result<Vec<EmployeeRecord>, GatewayError> {
        self.fetch(
            &self.employee_endpoint,
            &[
                ("select", "*".to_string()),
                ("order", "employee_name.asc.nullslast".to_string()),
            ],
        )
        .await
    }

    async fn find_employee(&self, code_value: &str) -> Result<Option<EmployeeRecord>, GatewayError> {
        let rows = self
            .fetch(
                &self.employee_endpoint,
                &[
                    ("code_value", format!("eq.{}", code_value)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}
