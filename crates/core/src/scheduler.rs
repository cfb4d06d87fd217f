use std::{future::Future, time::Duration};

use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::debug;

/// Owner of a periodic background task. The task stops on `stop()` or when
/// the handle is dropped, so a timer never outlives its view.
pub struct PollingHandle {
    name: &'static str,
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl PollingHandle {
    /// Signals shutdown and waits for the current tick, if any, to finish.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!(task = self.name, "periodic task stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Runs `job` immediately and then every `period` until stopped. A tick that
/// overruns the period delays the next one instead of bunching up.
pub fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, mut job: F) -> PollingHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, mut shutdown) = broadcast::channel::<()>(1);

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => return,
                _ = ticker.tick() => job().await,
            }
        }
    });

    debug!(task = name, ?period, "periodic task started");
    PollingHandle {
        name,
        shutdown_tx,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn counting_job(count: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> + Send + 'static {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_immediately_then_every_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic("test", Duration::from_secs(10), counting_job(&count));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_timer() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic("test", Duration::from_secs(10), counting_job(&count));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(handle.is_running());
        drop(handle);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
