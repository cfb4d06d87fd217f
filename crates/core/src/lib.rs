pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod matrix;
pub mod notify;
pub mod orchestrator;
pub mod provider;
pub mod queues;
pub mod repository;
pub mod scheduler;
pub mod types;

pub use api::{CaptionApi, HttpCaptionApi};
pub use catalog::{CatalogSnapshot, ModelCatalog};
pub use config::Config;
pub use error::{ApiError, CaptionError, Result};
pub use events::{CaptionEvent, EnrichedEvent, EventBus, GenerationOutcome};
pub use format::{
    caption_preview, format_caption_record, format_clip_duration, format_file_size,
    format_processing_time, format_video_line,
};
pub use matrix::{CaptionMatrixLoader, CaptionSlot, SlotAction};
pub use notify::{Notification, NotificationCenter, NotificationSink, Severity};
pub use orchestrator::{CaptionOrchestrator, Phase};
pub use provider::KnownModel;
pub use repository::{RefreshOutcome, VideoRepository, VideoSnapshot};
pub use scheduler::PollingHandle;
pub use types::{
    CaptionRecord, GenerationRequest, ModelDescriptor, PendingSelection, Video, VideoFilter,
    VideoStats,
};
