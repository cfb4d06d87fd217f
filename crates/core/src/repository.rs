use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::{Mutex, watch},
    time::Instant,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    api::CaptionApi,
    error::{CaptionError, Result},
    events::{CaptionEvent, EventBus},
    scheduler::{PollingHandle, spawn_periodic},
    types::{Video, VideoFilter, VideoStats},
};

/// The video list as of one successful fetch. Never a mix of two fetches.
#[derive(Debug, Clone, Default)]
pub struct VideoSnapshot {
    /// 0 until the first successful fetch.
    pub generation: u64,
    pub videos: Vec<Video>,
    pub fetched_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { generation: u64, count: usize },
    /// Another refresh was already in flight.
    Skipped,
}

/// Last-known-good video list. Writes are serialized; a failed fetch leaves
/// the previous snapshot in place.
pub struct VideoRepository {
    api: Arc<dyn CaptionApi>,
    snapshot_tx: watch::Sender<Arc<VideoSnapshot>>,
    write_lock: Mutex<()>,
    next_generation: AtomicU64,
    last_error: parking_lot::Mutex<Option<CaptionError>>,
    events: EventBus,
}

impl VideoRepository {
    pub fn new(api: Arc<dyn CaptionApi>, events: EventBus) -> Self {
        let (snapshot_tx, _rx) = watch::channel(Arc::new(VideoSnapshot::default()));
        Self {
            api,
            snapshot_tx,
            write_lock: Mutex::new(()),
            next_generation: AtomicU64::new(1),
            last_error: parking_lot::Mutex::new(None),
            events,
        }
    }

    /// Fetches the list and replaces the snapshot, waiting behind any refresh
    /// already in flight.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let _writer = self.write_lock.lock().await;
        self.fetch_and_apply().await
    }

    /// Like `refresh`, but returns `Skipped` instead of queueing when a
    /// refresh is already running. Used by the poller.
    pub async fn refresh_if_idle(&self) -> Result<RefreshOutcome> {
        let Ok(_writer) = self.write_lock.try_lock() else {
            debug!("refresh already in flight, skipping tick");
            return Ok(RefreshOutcome::Skipped);
        };
        self.fetch_and_apply().await
    }

    async fn fetch_and_apply(&self) -> Result<RefreshOutcome> {
        let videos = match self.api.list_videos().await {
            Ok(videos) => videos,
            Err(e) => {
                let err = CaptionError::RepositoryUnavailable {
                    reason: e.user_detail(),
                };
                warn!(error = %e, "video list refresh failed, keeping last snapshot");
                *self.last_error.lock() = Some(err.clone());
                return Err(err);
            }
        };

        let videos = dedupe_by_filename(videos);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let count = videos.len();

        self.snapshot_tx.send_replace(Arc::new(VideoSnapshot {
            generation,
            videos,
            fetched_at: Some(Instant::now()),
        }));
        *self.last_error.lock() = None;

        debug!(generation, count, "video snapshot applied");
        self.events
            .publish(CaptionEvent::VideosRefreshed { generation, count });
        Ok(RefreshOutcome::Applied { generation, count })
    }

    /// Refreshes now and then every `period` until the handle is stopped or
    /// dropped.
    pub fn start_polling(self: &Arc<Self>, period: Duration) -> PollingHandle {
        let repo = Arc::clone(self);
        info!(?period, "starting video list polling");
        spawn_periodic("video-poller", period, move || {
            let repo = Arc::clone(&repo);
            async move {
                // Failures are already recorded in `last_error`.
                let _ = repo.refresh_if_idle().await;
            }
        })
    }

    pub fn snapshot(&self) -> Arc<VideoSnapshot> {
        Arc::clone(&self.snapshot_tx.borrow())
    }

    /// Yields every applied snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<VideoSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn find(&self, filename: &str) -> Option<Video> {
        self.snapshot_tx
            .borrow()
            .videos
            .iter()
            .find(|video| video.filename == filename)
            .cloned()
    }

    pub fn filtered(&self, filter: VideoFilter) -> Vec<Video> {
        self.snapshot_tx
            .borrow()
            .videos
            .iter()
            .filter(|video| filter.matches(video))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> VideoStats {
        let snapshot = self.snapshot_tx.borrow();
        let captioned = snapshot.videos.iter().filter(|v| v.has_caption).count();
        VideoStats {
            total: snapshot.videos.len(),
            captioned,
            not_captioned: snapshot.videos.len() - captioned,
        }
    }

    /// Error from the most recent refresh, cleared by the next success.
    pub fn last_error(&self) -> Option<CaptionError> {
        self.last_error.lock().clone()
    }
}

fn dedupe_by_filename(videos: Vec<Video>) -> Vec<Video> {
    let mut seen = HashSet::with_capacity(videos.len());
    let mut unique = Vec::with_capacity(videos.len());
    for video in videos {
        if seen.insert(video.filename.clone()) {
            unique.push(video);
        } else {
            warn!(filename = %video.filename, "duplicate filename in video listing, ignoring");
        }
    }
    unique
}
