pub mod annotation;
pub mod commit_dispatcher;
pub mod commit_worker;
pub mod frame_publish;

pub use annotation::FrameAnnotator;
pub use commit_dispatcher::{CommitDispatcher, COMMIT_QUEUE_DEPTH};
pub use commit_worker::CommitWorker;
pub use frame_publish::FramePublishingService;
