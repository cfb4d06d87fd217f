use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A video as reported by the backend listing. `filename` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub filename: String,
    pub size: u64,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub has_caption: bool,
    #[serde(default)]
    pub has_audio: bool,
    /// Comma-joined keys of the models that produced a caption.
    #[serde(default)]
    pub model_used: Option<String>,
    /// Preview text of the first available caption.
    #[serde(default)]
    pub caption_text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Video {
    pub fn models(&self) -> Vec<&str> {
        self.model_used
            .as_deref()
            .map(|joined| {
                joined
                    .split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub key: String,
    pub name: String,
    pub display_name: String,
    pub default_prompt: String,
    /// False for audio-only models that ignore any prompt.
    pub accepts_prompt: bool,
}

/// Model entry as served by `GET /api/videos/available-models`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelListingEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub default_prompt: Option<String>,
    #[serde(default)]
    pub accepts_prompt: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelListing {
    pub models: BTreeMap<String, ModelListingEntry>,
    #[serde(default)]
    pub default: Option<String>,
}

/// The current caption for one (video, model) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionRecord {
    pub filename: String,
    #[serde(default)]
    pub model_key: String,
    pub caption: String,
    #[serde(default)]
    pub prompt: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub processing_time_seconds: f64,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub model_display_name: Option<String>,
}

/// Response of `GET /api/videos/{filename}/all-captions`.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionListing {
    #[serde(default)]
    pub captions: Vec<CaptionRecord>,
}

/// One generation call, alive for a single orchestration cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub id: Uuid,
    pub filename: String,
    pub model_key: String,
    pub prompt: Option<String>,
    pub regenerate: bool,
}

impl GenerationRequest {
    pub fn new(
        filename: impl Into<String>,
        model_key: impl Into<String>,
        prompt: Option<String>,
        regenerate: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            model_key: model_key.into(),
            prompt,
            regenerate,
        }
    }
}

/// A video waiting for the user to pick a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub filename: String,
    pub regenerate: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VideoFilter {
    #[default]
    All,
    Captioned,
    NotCaptioned,
}

impl VideoFilter {
    pub fn matches(&self, video: &Video) -> bool {
        match self {
            VideoFilter::All => true,
            VideoFilter::Captioned => video.has_caption,
            VideoFilter::NotCaptioned => !video.has_caption,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoStats {
    pub total: usize,
    pub captioned: usize,
    pub not_captioned: usize,
}
