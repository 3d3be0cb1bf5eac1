use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;
use tracing::Level;

use crate::error::AppError;
use crate::pipeline::types::EmployeeRecord;

const ENV_PREFIX: &str = "SCANGATE";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds before the same code is accepted again as a new candidate.
    pub cooldown_secs: f64,
    /// Seconds required between two committed rows for the same code.
    pub duplicate_window_secs: f64,
    /// Upper bound for one commit (read + write) against the gateway.
    pub gateway_timeout_ms: u64,
    pub frame_buffer_size: usize,
    pub annotate_frames: bool,
    pub log_level: String,
    pub gateway: GatewaySettings,
    pub observer: ObserverSettings,
    pub demo: DemoSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cooldown_secs: 2.0,
            duplicate_window_secs: 10.0,
            gateway_timeout_ms: 5_000,
            frame_buffer_size: 60,
            annotate_frames: true,
            log_level: "info".to_string(),
            gateway: GatewaySettings::default(),
            observer: ObserverSettings::default(),
            demo: DemoSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    #[default]
    Memory,
    Postgrest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub kind: GatewayKind,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub table: String,
    pub employee_table: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            kind: GatewayKind::Memory,
            url: None,
            api_key: None,
            table: "access_logs".to_string(),
            employee_table: "employee_master".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObserverSettings {
    pub poll_interval_ms: u64,
    pub recent_limit: usize,
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            recent_limit: 30,
        }
    }
}

/// One step of the simulated scene in front of the demo camera.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SceneStep {
    pub code: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub frame_interval_ms: u64,
    pub frame_jitter_ms: u64,
    pub script: Vec<SceneStep>,
    /// Seeds the in-memory employee directory.
    pub employees: Vec<EmployeeRecord>,
}

impl Default for DemoSettings {
    fn default() -> Self {
        let step = |code: Option<&str>, duration_ms| SceneStep {
            code: code.map(str::to_string),
            duration_ms,
        };
        Self {
            frame_interval_ms: 33,
            frame_jitter_ms: 20,
            script: vec![
                step(None, 1_000),
                step(Some("EMP-0001"), 3_000),
                step(None, 1_000),
                step(Some("EMP-0002"), 1_500),
                step(Some("EMP-0001"), 1_500),
                step(None, 2_000),
            ],
            employees: vec![
                EmployeeRecord::new("EMP-0001", "Ana Rahman")
                    .department("Drilling")
                    .company("Offshore Ops"),
                EmployeeRecord::new("EMP-0002", "Budi Santoso")
                    .department("Catering")
                    .company("Galley Services"),
            ],
        }
    }
}

impl Settings {
    /// Loads defaults, then the optional file at `path`, then `SCANGATE__*` overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn cooldown(&self) -> TimeDelta {
        secs_to_delta(self.cooldown_secs)
    }

    pub fn duplicate_window(&self) -> TimeDelta {
        secs_to_delta(self.duplicate_window_secs)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    pub fn max_log_level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.cooldown_secs > 0.0) {
            return Err(AppError::InvalidConfig(
                "Cooldown must be greater than 0".to_string(),
            ));
        }

        if !(self.duplicate_window_secs > 0.0) {
            return Err(AppError::InvalidConfig(
                "Duplicate window must be greater than 0".to_string(),
            ));
        }

        if self.gateway_timeout_ms == 0 {
            return Err(AppError::InvalidConfig(
                "Gateway timeout must be greater than 0".to_string(),
            ));
        }

        if self.frame_buffer_size == 0 {
            return Err(AppError::InvalidConfig(
                "Frame buffer size must be greater than 0".to_string(),
            ));
        }

        if self.observer.recent_limit == 0 {
            return Err(AppError::InvalidConfig(
                "Observer recent limit must be greater than 0".to_string(),
            ));
        }

        if self.observer.poll_interval_ms == 0 {
            return Err(AppError::InvalidConfig(
                "Observer poll interval must be greater than 0".to_string(),
            ));
        }

        if self.gateway.kind == GatewayKind::Postgrest && self.gateway.url.is_none() {
            return Err(AppError::InvalidConfig(
                "PostgREST gateway requires gateway.url".to_string(),
            ));
        }

        Ok(())
    }
}

fn secs_to_delta(secs: f64) -> TimeDelta {
    TimeDelta::milliseconds((secs * 1_000.0).round() as i64)
}
