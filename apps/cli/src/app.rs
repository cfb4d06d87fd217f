use std::sync::Arc;

use anyhow::Context;
use captiondesk_core::{
    CaptionMatrixLoader, CaptionOrchestrator, Config, EventBus, HttpCaptionApi, ModelCatalog,
    NotificationCenter, VideoRepository,
};
use indicatif::MultiProgress;

use crate::sink::ConsoleSink;

/// Everything one CLI invocation talks through, wired from a `Config`.
pub struct App {
    pub config: Config,
    pub api: Arc<HttpCaptionApi>,
    pub catalog: Arc<ModelCatalog>,
    pub repository: Arc<VideoRepository>,
    pub events: EventBus,
    pub sink: Arc<ConsoleSink>,
    pub progress: MultiProgress,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let api = Arc::new(
            HttpCaptionApi::new(&config).context("failed to build the backend client")?,
        );
        let events = EventBus::default();
        let progress = MultiProgress::new();
        let sink = Arc::new(ConsoleSink::new(
            progress.clone(),
            NotificationCenter::new(config.notification_ttl, config.notification_history),
        ));

        Ok(Self {
            catalog: Arc::new(ModelCatalog::new(api.clone())),
            repository: Arc::new(VideoRepository::new(api.clone(), events.clone())),
            api,
            events,
            sink,
            progress,
            config,
        })
    }

    pub fn orchestrator(&self) -> CaptionOrchestrator {
        CaptionOrchestrator::new(
            self.api.clone(),
            Arc::clone(&self.catalog),
            Arc::clone(&self.repository),
            self.sink.clone(),
            self.events.clone(),
            self.config.generation_timeout,
        )
    }

    pub fn matrix(&self, filename: &str) -> CaptionMatrixLoader {
        CaptionMatrixLoader::new(
            self.api.clone(),
            Arc::clone(&self.catalog),
            self.sink.clone(),
            self.events.clone(),
            filename,
            self.config.generation_timeout,
        )
        .with_repository(Arc::clone(&self.repository))
    }
}
