pub mod camera;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod pipeline;

pub use crate::config::Settings;
pub use crate::coordinator::{Coordinator, CoordinatorBuilder};
pub use crate::error::{AppError, GatewayError};
pub use crate::gateway::{AccessLogGateway, EmployeeDirectory, MemoryGateway, PostgrestGateway};
pub use crate::pipeline::{CheckpointBuilder, CheckpointSession, FrameIngestAdapter};
