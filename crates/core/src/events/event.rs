use std::time::SystemTime;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Succeeded,
    Failed { detail: String },
}

/// Something the orchestration layer did that a front end may want to show.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionEvent {
    SelectionRequested {
        filename: String,
        regenerate: bool,
    },
    SelectionCancelled {
        filename: String,
    },
    GenerationStarted {
        request_id: Uuid,
        filename: String,
        model_key: String,
        display_name: String,
        regenerate: bool,
    },
    GenerationFinished {
        request_id: Uuid,
        filename: String,
        model_key: String,
        outcome: GenerationOutcome,
    },
    VideosRefreshed {
        generation: u64,
        count: usize,
    },
    SlotStarted {
        filename: String,
        model_key: String,
        regenerate: bool,
    },
    SlotFinished {
        filename: String,
        model_key: String,
        outcome: GenerationOutcome,
    },
}

impl CaptionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CaptionEvent::SelectionRequested { .. } => "selection.requested",
            CaptionEvent::SelectionCancelled { .. } => "selection.cancelled",
            CaptionEvent::GenerationStarted { .. } => "generation.started",
            CaptionEvent::GenerationFinished { .. } => "generation.finished",
            CaptionEvent::VideosRefreshed { .. } => "videos.refreshed",
            CaptionEvent::SlotStarted { .. } => "matrix.slot_started",
            CaptionEvent::SlotFinished { .. } => "matrix.slot_finished",
        }
    }

    /// Progress line in the style of a loading dialog.
    pub fn progress_message(&self) -> Option<String> {
        match self {
            CaptionEvent::GenerationStarted {
                display_name,
                regenerate,
                ..
            } => Some(if *regenerate {
                format!("Regenerating caption with {display_name}...")
            } else {
                format!("Generating caption with {display_name}...")
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventHeader {
    pub event_id: Uuid,
    pub ingest_seq: u64,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone)]
pub struct EnrichedEvent {
    pub header: EventHeader,
    pub event: CaptionEvent,
}
