use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::{Mutex, RwLock};
use reqwest::Url;
use tracing::{debug, info, instrument, warn};

use crate::{
    api::CaptionApi,
    catalog::ModelCatalog,
    error::{ApiError, CaptionError, Result},
    events::{CaptionEvent, EventBus, GenerationOutcome},
    notify::{Notification, NotificationSink},
    repository::VideoRepository,
    types::{CaptionRecord, GenerationRequest},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    Generate,
    Regenerate,
}

/// One cell of the per-video caption matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSlot {
    pub model_key: String,
    pub display_name: String,
    pub record: Option<CaptionRecord>,
    pub in_flight: bool,
    pub last_error: Option<String>,
    pub action: SlotAction,
}

/// Clears a slot's in-flight marker on every exit path.
struct SlotGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    model_key: String,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.model_key);
    }
}

#[derive(Default)]
struct LoadedRecords {
    /// Sequence number of the load that produced `records`.
    seq: u64,
    records: Arc<BTreeMap<String, CaptionRecord>>,
}

/// Caption records for one video, one slot per model. Slots generate
/// independently of each other and of the orchestrator.
pub struct CaptionMatrixLoader {
    api: Arc<dyn CaptionApi>,
    catalog: Arc<ModelCatalog>,
    notifier: Arc<dyn NotificationSink>,
    events: EventBus,
    repository: Option<Arc<VideoRepository>>,
    generation_timeout: Duration,
    filename: String,
    next_load_seq: AtomicU64,
    loaded: RwLock<LoadedRecords>,
    in_flight: Mutex<HashSet<String>>,
    slot_errors: Mutex<HashMap<String, String>>,
    load_error: Mutex<Option<CaptionError>>,
}

impl CaptionMatrixLoader {
    pub fn new(
        api: Arc<dyn CaptionApi>,
        catalog: Arc<ModelCatalog>,
        notifier: Arc<dyn NotificationSink>,
        events: EventBus,
        filename: impl Into<String>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            api,
            catalog,
            notifier,
            events,
            repository: None,
            generation_timeout,
            filename: filename.into(),
            next_load_seq: AtomicU64::new(1),
            loaded: RwLock::new(LoadedRecords::default()),
            in_flight: Mutex::new(HashSet::new()),
            slot_errors: Mutex::new(HashMap::new()),
            load_error: Mutex::new(None),
        }
    }

    /// Refreshes `repository` once after every successful slot generation.
    pub fn with_repository(mut self, repository: Arc<VideoRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Replaces the records with the backend's current set. On failure the
    /// previous records stay and the error is kept for `load_error()`.
    /// Loads may overlap; a load that started before the applied one is
    /// discarded and the newer records are returned.
    #[instrument(skip(self), fields(filename = %self.filename))]
    pub async fn load_all(&self) -> Result<Arc<BTreeMap<String, CaptionRecord>>> {
        let seq = self.next_load_seq.fetch_add(1, Ordering::Relaxed);
        let captions = match self.api.list_captions(&self.filename).await {
            Ok(captions) => captions,
            Err(e) => {
                let err = CaptionError::MatrixLoadFailed {
                    filename: self.filename.clone(),
                    reason: e.user_detail(),
                };
                warn!(error = %e, "caption matrix load failed, keeping previous records");
                if seq > self.loaded.read().seq {
                    *self.load_error.lock() = Some(err.clone());
                }
                return Err(err);
            }
        };

        let mut records = BTreeMap::new();
        for record in captions {
            if record.model_key.is_empty() {
                warn!("caption record without model key, ignoring");
                continue;
            }
            records.insert(record.model_key.clone(), record);
        }

        let mut loaded = self.loaded.write();
        if seq < loaded.seq {
            debug!(seq, applied = loaded.seq, "stale caption matrix load discarded");
            return Ok(Arc::clone(&loaded.records));
        }

        debug!(seq, count = records.len(), "caption matrix loaded");
        loaded.seq = seq;
        loaded.records = Arc::new(records);
        *self.load_error.lock() = None;
        Ok(Arc::clone(&loaded.records))
    }

    pub async fn generate(&self, model_key: &str) -> Result<CaptionRecord> {
        self.run_slot(model_key, false).await
    }

    pub async fn regenerate(&self, model_key: &str) -> Result<CaptionRecord> {
        self.run_slot(model_key, true).await
    }

    #[instrument(skip(self), fields(filename = %self.filename))]
    async fn run_slot(&self, model_key: &str, regenerate: bool) -> Result<CaptionRecord> {
        if !self.in_flight.lock().insert(model_key.to_string()) {
            return Err(CaptionError::SlotBusy {
                filename: self.filename.clone(),
                model_key: model_key.to_string(),
            });
        }
        let guard = SlotGuard {
            in_flight: &self.in_flight,
            model_key: model_key.to_string(),
        };
        self.slot_errors.lock().remove(model_key);

        let display_name = self.catalog.display_name(model_key);
        info!(model = model_key, regenerate, "generating caption for slot");
        self.events.publish(CaptionEvent::SlotStarted {
            filename: self.filename.clone(),
            model_key: model_key.to_string(),
            regenerate,
        });

        let request = GenerationRequest::new(self.filename.clone(), model_key, None, regenerate);
        let result = match tokio::time::timeout(
            self.generation_timeout,
            self.api.generate_caption(&request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ApiError::timeout(format!(
                "caption generation timed out after {}s",
                self.generation_timeout.as_secs()
            ))),
        };
        drop(guard);

        match result {
            Ok(record) => {
                self.finish(model_key, GenerationOutcome::Succeeded);
                if let Err(e) = self.load_all().await {
                    warn!(error = %e, "caption matrix reload after generation failed");
                }
                if let Some(repository) = &self.repository {
                    if let Err(e) = repository.refresh().await {
                        warn!(error = %e, "video list refresh after generation failed");
                    }
                }

                let verb = if regenerate { "regenerated" } else { "generated" };
                self.notifier.notify(Notification::success(format!(
                    "Caption {verb} successfully with {display_name}!"
                )));
                Ok(record)
            }
            Err(e) => Err(self.fail_slot(model_key, &display_name, e)),
        }
    }

    fn fail_slot(&self, model_key: &str, display_name: &str, error: ApiError) -> CaptionError {
        let detail = error.user_detail();
        warn!(model = model_key, error = %error, "slot generation failed");

        self.slot_errors
            .lock()
            .insert(model_key.to_string(), detail.clone());
        self.finish(
            model_key,
            GenerationOutcome::Failed {
                detail: detail.clone(),
            },
        );
        self.notifier.notify(Notification::error(format!(
            "Failed to generate caption with {display_name}: {detail}"
        )));

        CaptionError::GenerationFailed {
            filename: self.filename.clone(),
            model_key: model_key.to_string(),
            detail,
        }
    }

    fn finish(&self, model_key: &str, outcome: GenerationOutcome) {
        self.events.publish(CaptionEvent::SlotFinished {
            filename: self.filename.clone(),
            model_key: model_key.to_string(),
            outcome,
        });
    }

    /// Catalog models in catalog order, then records for models the catalog
    /// does not list.
    pub fn slots(&self) -> Vec<CaptionSlot> {
        let catalog = self.catalog.snapshot();
        let records = self.records();
        let in_flight = self.in_flight.lock().clone();
        let slot_errors = self.slot_errors.lock().clone();

        let extra = records
            .keys()
            .filter(|key| !catalog.models.contains_key(*key));

        catalog
            .models
            .keys()
            .chain(extra)
            .map(|key| {
                let record = records.get(key).cloned();
                CaptionSlot {
                    model_key: key.clone(),
                    display_name: catalog
                        .models
                        .get(key)
                        .map(|model| model.display_name.clone())
                        .unwrap_or_else(|| key.clone()),
                    action: if record.is_some() {
                        SlotAction::Regenerate
                    } else {
                        SlotAction::Generate
                    },
                    record,
                    in_flight: in_flight.contains(key),
                    last_error: slot_errors.get(key).cloned(),
                }
            })
            .collect()
    }

    pub fn records(&self) -> Arc<BTreeMap<String, CaptionRecord>> {
        Arc::clone(&self.loaded.read().records)
    }

    pub fn record(&self, model_key: &str) -> Option<CaptionRecord> {
        self.loaded.read().records.get(model_key).cloned()
    }

    pub fn is_in_flight(&self, model_key: &str) -> bool {
        self.in_flight.lock().contains(model_key)
    }

    pub fn load_error(&self) -> Option<CaptionError> {
        self.load_error.lock().clone()
    }

    pub fn stream_url(&self) -> Result<Url> {
        self.api
            .stream_url(&self.filename)
            .map_err(|e| CaptionError::MatrixLoadFailed {
                filename: self.filename.clone(),
                reason: e.to_string(),
            })
    }
}
