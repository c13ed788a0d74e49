use super::Counters;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// Background worker that periodically refreshes counter rates
pub struct StatisticsWorker {
    counters: Arc<Counters>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl StatisticsWorker {
    pub fn new(counters: Arc<Counters>, interval: Duration) -> Self {
        Self {
            counters,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the background worker
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!("Statistics worker started with interval {:?}", self.interval);

            let mut interval = time::interval(self.interval);

            while self.running.load(Ordering::SeqCst) {
                interval.tick().await;
                self.counters.update_rates();
            }

            tracing::info!("Statistics worker stopped");
        })
    }

    /// Stop the worker
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if worker is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
