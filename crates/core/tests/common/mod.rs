#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use captiondesk_core::{
    ApiError, CaptionApi, CaptionOrchestrator, CaptionRecord, EventBus, GenerationRequest,
    ModelCatalog, Notification, NotificationSink, Severity, Video, VideoRepository,
    api::endpoint,
    config::DEFAULT_API_URL,
    types::{ModelListing, ModelListingEntry},
};
use chrono::Utc;
use parking_lot::Mutex;
use reqwest::Url;
use tokio::sync::Notify;

pub const MODEL_KEYS: [&str; 4] = ["omnivinci", "qwen2vl", "qwen3omni", "qwen3omni_captioner"];

/// Scripted backend. Every call is counted; generation and listing can be
/// held on a gate until the test releases them.
#[derive(Default)]
pub struct FakeApi {
    pub videos: Mutex<Vec<Video>>,
    pub captions: Mutex<Vec<CaptionRecord>>,
    pub list_videos_calls: AtomicUsize,
    pub list_models_calls: AtomicUsize,
    pub list_captions_calls: AtomicUsize,
    pub generate_requests: Mutex<Vec<GenerationRequest>>,
    pub deleted: Mutex<Vec<String>>,
    list_videos_error: Mutex<Option<ApiError>>,
    list_captions_error: Mutex<Option<ApiError>>,
    list_models_error: Mutex<Option<ApiError>>,
    generate_errors: Mutex<HashMap<String, ApiError>>,
    generate_gates: Mutex<HashMap<String, Arc<Notify>>>,
    list_videos_gate: Mutex<Option<Arc<Notify>>>,
    /// Held by the next `list_captions` call after it has read the records.
    list_captions_gate: Mutex<Option<Arc<Notify>>>,
    /// Replaces `videos` on the next `list_videos` call, then cleared.
    next_listing: Mutex<Option<Vec<Video>>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_videos(videos: Vec<Video>) -> Arc<Self> {
        let api = Self::default();
        *api.videos.lock() = videos;
        Arc::new(api)
    }

    pub fn fail_list_videos(&self, error: Option<ApiError>) {
        *self.list_videos_error.lock() = error;
    }

    pub fn fail_list_captions(&self, error: Option<ApiError>) {
        *self.list_captions_error.lock() = error;
    }

    pub fn fail_list_models(&self, error: Option<ApiError>) {
        *self.list_models_error.lock() = error;
    }

    pub fn fail_generation(&self, model_key: &str, error: ApiError) {
        self.generate_errors
            .lock()
            .insert(model_key.to_string(), error);
    }

    /// Holds generation for `model_key` until the returned gate is notified.
    pub fn gate_generation(&self, model_key: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.generate_gates
            .lock()
            .insert(model_key.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn gate_list_videos(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_videos_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// The next `list_captions` call reads the current records, then waits
    /// for the returned gate before answering.
    pub fn hold_next_list_captions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_captions_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn list_captions_calls(&self) -> usize {
        self.list_captions_calls.load(Ordering::SeqCst)
    }

    pub fn set_next_listing(&self, videos: Vec<Video>) {
        *self.next_listing.lock() = Some(videos);
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_requests.lock().len()
    }

    pub fn list_videos_calls(&self) -> usize {
        self.list_videos_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptionApi for FakeApi {
    async fn list_videos(&self) -> Result<Vec<Video>, ApiError> {
        self.list_videos_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.list_videos_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.list_videos_error.lock().clone() {
            return Err(err);
        }
        if let Some(next) = self.next_listing.lock().take() {
            *self.videos.lock() = next;
        }
        Ok(self.videos.lock().clone())
    }

    async fn list_models(&self) -> Result<ModelListing, ApiError> {
        self.list_models_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_models_error.lock().clone() {
            return Err(err);
        }
        Ok(four_model_listing())
    }

    async fn generate_caption(
        &self,
        request: &GenerationRequest,
    ) -> Result<CaptionRecord, ApiError> {
        self.generate_requests.lock().push(request.clone());

        let gate = self.generate_gates.lock().get(&request.model_key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.generate_errors.lock().get(&request.model_key).cloned() {
            return Err(err);
        }

        let record = record(&request.filename, &request.model_key);
        let mut captions = self.captions.lock();
        captions.retain(|r| !(r.filename == record.filename && r.model_key == record.model_key));
        captions.push(record.clone());

        for video in self.videos.lock().iter_mut() {
            if video.filename == request.filename {
                video.has_caption = true;
            }
        }
        Ok(record)
    }

    async fn list_captions(&self, filename: &str) -> Result<Vec<CaptionRecord>, ApiError> {
        self.list_captions_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_captions_error.lock().clone() {
            return Err(err);
        }
        let records: Vec<CaptionRecord> = self
            .captions
            .lock()
            .iter()
            .filter(|r| r.filename == filename)
            .cloned()
            .collect();

        let gate = self.list_captions_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(records)
    }

    async fn delete_caption(&self, filename: &str) -> Result<(), ApiError> {
        self.deleted.lock().push(filename.to_string());
        Ok(())
    }

    async fn health(&self) -> Result<serde_json::Value, ApiError> {
        Ok(serde_json::json!({ "status": "healthy" }))
    }

    fn stream_url(&self, filename: &str) -> Result<Url, ApiError> {
        let base = Url::parse(DEFAULT_API_URL).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        endpoint(&base, &["api", "videos", filename, "stream"])
    }
}

/// Records notifications, and for each one the video snapshot generation
/// that was visible when it arrived.
#[derive(Default)]
pub struct RecordingSink {
    pub notifications: Mutex<Vec<Notification>>,
    pub generation_at_notify: Mutex<Vec<u64>>,
    repository: OnceLock<Arc<VideoRepository>>,
}

impl RecordingSink {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<Notification> {
        self.notifications
            .lock()
            .iter()
            .filter(|n| n.severity == severity)
            .cloned()
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        if let Some(repository) = self.repository.get() {
            self.generation_at_notify
                .lock()
                .push(repository.snapshot().generation);
        }
        self.notifications.lock().push(notification);
    }
}

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub catalog: Arc<ModelCatalog>,
    pub repository: Arc<VideoRepository>,
    pub sink: Arc<RecordingSink>,
    pub events: EventBus,
    pub orchestrator: CaptionOrchestrator,
}

pub async fn harness(api: Arc<FakeApi>) -> Harness {
    harness_with_timeout(api, Duration::from_secs(300)).await
}

pub async fn harness_with_timeout(api: Arc<FakeApi>, generation_timeout: Duration) -> Harness {
    let events = EventBus::default();
    let catalog = Arc::new(ModelCatalog::new(api.clone()));
    catalog.load().await.expect("catalog loads from fake");

    let repository = Arc::new(VideoRepository::new(api.clone(), events.clone()));
    let sink = Arc::new(RecordingSink::default());
    let _ = sink.repository.set(Arc::clone(&repository));

    let orchestrator = CaptionOrchestrator::new(
        api.clone(),
        Arc::clone(&catalog),
        Arc::clone(&repository),
        sink.clone(),
        events.clone(),
        generation_timeout,
    );

    Harness {
        api,
        catalog,
        repository,
        sink,
        events,
        orchestrator,
    }
}

pub fn four_model_listing() -> ModelListing {
    let models: BTreeMap<String, ModelListingEntry> = MODEL_KEYS
        .iter()
        .map(|key| {
            (
                key.to_string(),
                ModelListingEntry {
                    name: Some(format!("{key}-backend")),
                    display_name: None,
                    default_prompt: None,
                    accepts_prompt: None,
                },
            )
        })
        .collect();
    ModelListing {
        models,
        default: Some("qwen2vl".to_string()),
    }
}

pub fn video(filename: &str, has_caption: bool) -> Video {
    Video {
        filename: filename.to_string(),
        size: 1024 * 1024,
        duration: Some(12.0),
        has_caption,
        has_audio: true,
        model_used: None,
        caption_text: None,
        created_at: None,
    }
}

pub fn record(filename: &str, model_key: &str) -> CaptionRecord {
    CaptionRecord {
        filename: filename.to_string(),
        model_key: model_key.to_string(),
        caption: format!("{model_key} caption for {filename}"),
        prompt: None,
        generated_at: Utc::now(),
        processing_time_seconds: 1.5,
        model_name: None,
        model_version: None,
        model_display_name: None,
    }
}
