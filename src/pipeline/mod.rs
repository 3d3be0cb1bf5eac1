pub mod debounce;
pub mod decoder;
pub mod ingest;
pub mod observer;
pub mod services;
pub mod session;
pub mod state_machine;
pub mod stats;
pub mod status_channel;
pub mod types;

pub use debounce::{DebounceGate, DebounceState};
pub use decoder::{CodeDecoder, ScriptedDecoder};
pub use ingest::FrameIngestAdapter;
pub use observer::{ObserverSnapshot, StatusObserver};
pub use services::{CommitDispatcher, CommitWorker, FrameAnnotator, FramePublishingService};
pub use session::{CheckpointBuilder, CheckpointSession};
pub use state_machine::{AssessmentGuard, AssessmentTicket, Phase, ScanStateMachine};
pub use stats::{SessionStats, StatsSnapshot};
pub use status_channel::{StatusChannel, StatusReader};
pub use types::{
    BoundingBox, CodeType, CommitOutcome, CommitResult, Detection, LogRecord, ScanEvent, ScanStatus,
};
