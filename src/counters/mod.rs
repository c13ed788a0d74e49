//! Process-wide event counters with smoothed rates.
//!
//! One [`Counters`] registry is created at startup and handed to whatever
//! increments or reads it. Every operation is a plain atomic; readers may see
//! distinct counters from slightly different instants.

pub mod worker;

pub use worker::StatisticsWorker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Minimum time between two rate updates
pub const STATISTICS_INTERVAL: Duration = Duration::from_secs(5);

/// Weight of the newest sample in the smoothed rate
const RATING_WEIGHT: f64 = 0.25;

const NEVER: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    NebCallbacks,
    Requests,
    Connections,
    ServiceChecks,
    HostChecks,
    Forks,
    LogMessages,
    Commands,
    Livechecks,
    LivecheckOverflows,
}

impl Counter {
    pub const ALL: [Counter; 10] = [
        Counter::NebCallbacks,
        Counter::Requests,
        Counter::Connections,
        Counter::ServiceChecks,
        Counter::HostChecks,
        Counter::Forks,
        Counter::LogMessages,
        Counter::Commands,
        Counter::Livechecks,
        Counter::LivecheckOverflows,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Column name in the status table
    pub fn name(&self) -> &'static str {
        match self {
            Counter::NebCallbacks => "neb_callbacks",
            Counter::Requests => "requests",
            Counter::Connections => "connections",
            Counter::ServiceChecks => "service_checks",
            Counter::HostChecks => "host_checks",
            Counter::Forks => "forks",
            Counter::LogMessages => "log_messages",
            Counter::Commands => "external_commands",
            Counter::Livechecks => "livechecks",
            Counter::LivecheckOverflows => "livecheck_overflows",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Counter::NebCallbacks => "The number of NEB call backs since program start",
            Counter::Requests => "The number of requests to the query engine since program start",
            Counter::Connections => "The number of client connections since program start",
            Counter::ServiceChecks => "The number of completed service checks since program start",
            Counter::HostChecks => "The number of host checks since program start",
            Counter::Forks => "The number of process creations since program start",
            Counter::LogMessages => "The number of new log messages since program start",
            Counter::Commands => "The number of external commands since program start",
            Counter::Livechecks => "The number of checks executed via livecheck since program start",
            Counter::LivecheckOverflows => {
                "The number of times a check could not be executed because no livecheck helper was free"
            }
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    value: AtomicU64,
    last_value: AtomicU64,
    /// f64 bits of the smoothed per-second rate
    rate: AtomicU64,
}

/// Registry of every [`Counter`]
#[derive(Debug)]
pub struct Counters {
    slots: [Slot; Counter::ALL.len()],
    epoch: Instant,
    interval: Duration,
    /// Milliseconds since `epoch` of the last rate update, or `NEVER`
    last_update_ms: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::with_interval(STATISTICS_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            slots: Default::default(),
            epoch: Instant::now(),
            interval,
            last_update_ms: AtomicU64::new(NEVER),
        }
    }

    fn slot(&self, which: Counter) -> &Slot {
        &self.slots[which.index()]
    }

    pub fn increment(&self, which: Counter) {
        self.add(which, 1);
    }

    pub fn add(&self, which: Counter, n: u64) {
        self.slot(which).value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn read(&self, which: Counter) -> u64 {
        self.slot(which).value.load(Ordering::Relaxed)
    }

    /// Smoothed events per second as of the last rate update
    pub fn rate(&self, which: Counter) -> f64 {
        f64::from_bits(self.slot(which).rate.load(Ordering::Relaxed))
    }

    pub fn update_rates(&self) {
        self.update_rates_at(Instant::now());
    }

    /// Refresh the smoothed rates. The first call only records a baseline;
    /// calls closer together than the statistics interval are ignored.
    pub fn update_rates_at(&self, now: Instant) {
        let now_ms = now.saturating_duration_since(self.epoch).as_millis() as u64;
        let last_ms = self.last_update_ms.load(Ordering::Acquire);

        if last_ms == NEVER {
            if self
                .last_update_ms
                .compare_exchange(NEVER, now_ms, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                for slot in &self.slots {
                    slot.last_value
                        .store(slot.value.load(Ordering::Relaxed), Ordering::Relaxed);
                }
            }
            return;
        }

        let elapsed_ms = now_ms.saturating_sub(last_ms);
        if elapsed_ms < self.interval.as_millis() as u64 {
            return;
        }
        // Only one caller wins the update for this interval
        if self
            .last_update_ms
            .compare_exchange(last_ms, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let elapsed = elapsed_ms as f64 / 1000.0;
        for slot in &self.slots {
            let value = slot.value.load(Ordering::Relaxed);
            let last = slot.last_value.swap(value, Ordering::Relaxed);
            let sample = value.saturating_sub(last) as f64 / elapsed;
            let old = f64::from_bits(slot.rate.load(Ordering::Relaxed));
            let rate = if old == 0.0 {
                sample
            } else {
                RATING_WEIGHT * sample + (1.0 - RATING_WEIGHT) * old
            };
            slot.rate.store(rate.to_bits(), Ordering::Relaxed);
        }
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_are_independent() {
        let counters = Counters::new();
        counters.increment(Counter::Requests);
        counters.increment(Counter::Requests);
        counters.add(Counter::HostChecks, 5);

        assert_eq!(counters.read(Counter::Requests), 2);
        assert_eq!(counters.read(Counter::HostChecks), 5);
        assert_eq!(counters.read(Counter::Forks), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let counters = Arc::new(Counters::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.increment(Counter::Connections);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.read(Counter::Connections), 8000);
    }

    #[test]
    fn test_first_update_only_sets_baseline() {
        let counters = Counters::with_interval(Duration::from_secs(5));
        counters.add(Counter::Requests, 100);
        counters.update_rates_at(counters.epoch + Duration::from_secs(1));
        assert_eq!(counters.rate(Counter::Requests), 0.0);
    }

    #[test]
    fn test_rate_and_smoothing() {
        let counters = Counters::with_interval(Duration::from_secs(5));
        let t0 = counters.epoch;
        counters.update_rates_at(t0);

        counters.add(Counter::Requests, 50);
        counters.update_rates_at(t0 + Duration::from_secs(10));
        assert!((counters.rate(Counter::Requests) - 5.0).abs() < 1e-9);

        // Too early, ignored
        counters.add(Counter::Requests, 1000);
        counters.update_rates_at(t0 + Duration::from_secs(11));
        assert!((counters.rate(Counter::Requests) - 5.0).abs() < 1e-9);

        // 1000 events over 10s = 100/s, smoothed: 0.25 * 100 + 0.75 * 5
        counters.update_rates_at(t0 + Duration::from_secs(20));
        assert!((counters.rate(Counter::Requests) - 28.75).abs() < 1e-9);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Counter::ALL.iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Counter::ALL.len());
    }
}
