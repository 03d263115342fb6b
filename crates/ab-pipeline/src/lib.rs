pub mod error;
pub mod history;
pub mod model;
pub mod orchestrator;
pub mod service;
pub mod shapes;

pub use error::{PipelineError, Result};
pub use history::{HISTORY_CAP, HistoryStats, MemoryStorage, PipelineHistory, Storage};
pub use model::{
    GenerationPipeline, PipelineMetadata, PipelineStage, PipelineStatus, StageError, StageRecord,
    ValidationOutcome,
};
pub use orchestrator::{Orchestrator, PipelineConfig, ProgressUpdate};
pub use service::{
    CancelHandle, CancelToken, GenerationService, HttpGenerationService, ValidationVerdict,
    cancel_pair,
};
pub use shapes::{
    HighLevelShape, LowLevelShape, extract_json_array, extract_json_object,
    repair_low_level_shape, validate_high_level_array, validate_high_level_shape,
    validate_low_level_shape,
};
