pub mod backend;
pub mod capture;
pub mod level;
pub mod recorder;

pub use backend::{AudioBackend, CaptureConfig, FileBackend};
pub use capture::{AudioFrame, CaptureStage, FrameSink, DEFAULT_QUANTUM_SIZE};
pub use level::{frame_level, LevelMode};
pub use recorder::{FrameRecorder, RecordingSummary};
