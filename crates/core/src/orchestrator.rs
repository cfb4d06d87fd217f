use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    api::CaptionApi,
    catalog::ModelCatalog,
    error::{ApiError, CaptionError, Result},
    events::{CaptionEvent, EnrichedEvent, EventBus, GenerationOutcome},
    notify::{Notification, NotificationSink},
    repository::VideoRepository,
    types::{CaptionRecord, GenerationRequest, PendingSelection},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    AwaitingModelChoice(PendingSelection),
    Generating(GenerationRequest),
}

#[derive(Default)]
struct OrchestratorState {
    pending: Option<PendingSelection>,
    in_flight: Option<GenerationRequest>,
}

/// Clears the in-flight request when dropped, whether the call finished,
/// failed, timed out or the awaiting future was dropped.
struct InFlightGuard<'a> {
    state: &'a Mutex<OrchestratorState>,
    request_id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state
            .in_flight
            .as_ref()
            .is_some_and(|request| request.id == self.request_id)
        {
            state.in_flight = None;
        }
    }
}

/// Drives one caption generation at a time:
/// `Idle -> AwaitingModelChoice -> Generating -> Idle`.
pub struct CaptionOrchestrator {
    api: Arc<dyn CaptionApi>,
    catalog: Arc<ModelCatalog>,
    repository: Arc<VideoRepository>,
    notifier: Arc<dyn NotificationSink>,
    events: EventBus,
    generation_timeout: Duration,
    state: Mutex<OrchestratorState>,
}

impl CaptionOrchestrator {
    pub fn new(
        api: Arc<dyn CaptionApi>,
        catalog: Arc<ModelCatalog>,
        repository: Arc<VideoRepository>,
        notifier: Arc<dyn NotificationSink>,
        events: EventBus,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            api,
            catalog,
            repository,
            notifier,
            events,
            generation_timeout,
            state: Mutex::new(OrchestratorState::default()),
        }
    }

    pub fn phase(&self) -> Phase {
        let state = self.state.lock();
        match (&state.in_flight, &state.pending) {
            (Some(request), _) => Phase::Generating(request.clone()),
            (None, Some(pending)) => Phase::AwaitingModelChoice(pending.clone()),
            (None, None) => Phase::Idle,
        }
    }

    pub fn pending(&self) -> Option<PendingSelection> {
        self.state.lock().pending.clone()
    }

    pub fn in_flight(&self) -> Option<GenerationRequest> {
        self.state.lock().in_flight.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EnrichedEvent>> {
        self.events.subscribe()
    }

    /// Asks for a model choice for `filename`. A selection that was still
    /// pending is abandoned; nothing had been sent for it.
    pub fn request_generation(&self, filename: impl Into<String>, regenerate: bool) {
        let selection = PendingSelection {
            filename: filename.into(),
            regenerate,
        };

        let abandoned = self.state.lock().pending.replace(selection.clone());
        if let Some(abandoned) = abandoned {
            info!(filename = %abandoned.filename, "pending selection replaced");
        }

        self.events.publish(CaptionEvent::SelectionRequested {
            filename: selection.filename,
            regenerate,
        });
    }

    /// Drops the pending selection. Does not touch a generation already in
    /// flight.
    pub fn cancel_selection(&self) -> Result<PendingSelection> {
        let Some(cancelled) = self.state.lock().pending.take() else {
            return Err(CaptionError::NoPendingSelection);
        };

        self.events.publish(CaptionEvent::SelectionCancelled {
            filename: cancelled.filename.clone(),
        });
        Ok(cancelled)
    }

    /// Sends exactly one generation call for the pending selection with
    /// `model_key`. When `prompt` is `None` the model's default prompt is used;
    /// prompt-less models get no prompt at all.
    #[instrument(skip(self, prompt))]
    pub async fn confirm_model(
        &self,
        model_key: &str,
        prompt: Option<&str>,
    ) -> Result<CaptionRecord> {
        let request = match self.begin(model_key, prompt) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "generation request rejected");
                self.notifier.notify(Notification::warning(err.to_string()));
                return Err(err);
            }
        };

        let display_name = self.catalog.display_name(&request.model_key);
        let guard = InFlightGuard {
            state: &self.state,
            request_id: request.id,
        };

        info!(
            request_id = %request.id,
            filename = %request.filename,
            model = %request.model_key,
            regenerate = request.regenerate,
            "generating caption"
        );
        self.events.publish(CaptionEvent::GenerationStarted {
            request_id: request.id,
            filename: request.filename.clone(),
            model_key: request.model_key.clone(),
            display_name: display_name.clone(),
            regenerate: request.regenerate,
        });

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
                self.events.publish(CaptionEvent::GenerationFinished {
                    request_id: request.id,
                    filename: request.filename.clone(),
                    model_key: request.model_key.clone(),
                    outcome: GenerationOutcome::Succeeded,
                });

                if let Err(e) = self.repository.refresh().await {
                    warn!(error = %e, "video list refresh after generation failed");
                }

                let verb = if request.regenerate {
                    "regenerated"
                } else {
                    "generated"
                };
                self.notifier.notify(Notification::success(format!(
                    "Caption {verb} successfully with {display_name}!"
                )));
                Ok(record)
            }
            Err(e) => {
                let detail = e.user_detail();
                warn!(request_id = %request.id, error = %e, "caption generation failed");

                self.events.publish(CaptionEvent::GenerationFinished {
                    request_id: request.id,
                    filename: request.filename.clone(),
                    model_key: request.model_key.clone(),
                    outcome: GenerationOutcome::Failed {
                        detail: detail.clone(),
                    },
                });
                self.notifier.notify(Notification::error(format!(
                    "Failed to generate caption: {detail}"
                )));

                Err(CaptionError::GenerationFailed {
                    filename: request.filename,
                    model_key: request.model_key,
                    detail,
                })
            }
        }
    }

    /// Validates the transition and moves the pending selection in flight.
    fn begin(&self, model_key: &str, prompt: Option<&str>) -> Result<GenerationRequest> {
        let mut state = self.state.lock();

        if state.in_flight.is_some() {
            return Err(CaptionError::OrchestratorBusy);
        }
        if state.pending.is_none() {
            return Err(CaptionError::NoPendingSelection);
        }
        if self.catalog.descriptor(model_key).is_none() {
            return Err(CaptionError::UnknownModel {
                model_key: model_key.to_string(),
            });
        }

        let Some(selection) = state.pending.take() else {
            return Err(CaptionError::NoPendingSelection);
        };
        let request = GenerationRequest::new(
            selection.filename,
            model_key,
            self.catalog.effective_prompt(model_key, prompt),
            selection.regenerate,
        );
        state.in_flight = Some(request.clone());
        Ok(request)
    }
}
