use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::events::{CaptionEvent, EnrichedEvent, EventHeader};

const DEFAULT_CAPACITY: usize = 64;

/// Fan-out of orchestration events. Publishing never blocks; slow subscribers
/// lag and skip rather than hold the orchestrator back.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

struct EventBusInner {
    tx: broadcast::Sender<Arc<EnrichedEvent>>,
    next_ingest_seq: AtomicU64,
    unobserved_total: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(EventBusInner {
                tx,
                next_ingest_seq: AtomicU64::new(0),
                unobserved_total: AtomicU64::new(0),
            }),
        }
    }

    pub fn publish(&self, event: CaptionEvent) {
        let ingest_seq = self.inner.next_ingest_seq.fetch_add(1, Ordering::Relaxed);
        trace!(event_type = event.event_type(), ingest_seq, "publish");

        let enriched = Arc::new(EnrichedEvent {
            header: EventHeader {
                event_id: Uuid::new_v4(),
                ingest_seq,
                timestamp: SystemTime::now(),
            },
            event,
        });

        if self.inner.tx.send(enriched).is_err() {
            self.inner.unobserved_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EnrichedEvent>> {
        self.inner.tx.subscribe()
    }

    /// Events published while nobody was subscribed.
    pub fn unobserved_total(&self) -> u64 {
        self.inner.unobserved_total.load(Ordering::Relaxed)
    }
}
