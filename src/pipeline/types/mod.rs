mod commit_result;
mod detection;
mod employee;
mod log_record;
mod scan_event;
mod status;

pub use commit_result::{CommitOutcome, CommitResult};
pub use detection::{BoundingBox, CodeType, Detection};
pub use employee::EmployeeRecord;
pub use log_record::{LogRecord, RESULT_OK};
pub use scan_event::ScanEvent;
pub use status::ScanStatus;
