//! Counters shared between the workers and the coordinator of one run.
//!
//! Each counter is an independent atomic. Reads taken while workers are
//! running may interleave arbitrarily; only the snapshot taken after the
//! running count reaches zero is exact. The `Release` decrement of the
//! running count paired with the coordinator's `Acquire` load makes every
//! worker's last update visible at that point.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Live totals for a single benchmark run
#[derive(Debug, Default)]
pub struct SharedCounters {
    /// Request bytes written across all connections
    payload_bytes: AtomicU64,
    /// Requests whose replies were fully read
    completed: AtomicU64,
    /// Sum of batch round-trip times, in nanoseconds
    busy_nanos: AtomicU64,
    /// Time since the run started at the most recent completion, in nanoseconds
    last_completion_nanos: AtomicU64,
    /// Workers that have not finished yet
    running: AtomicUsize,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    pub payload_bytes: u64,
    pub completed: u64,
    pub busy: Duration,
    pub last_completion: Duration,
    pub running: usize,
}

impl Snapshot {
    /// Completed requests per second of real time
    pub fn rate(&self) -> f64 {
        let secs = self.last_completion.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }
}

impl SharedCounters {
    /// Create counters for a run with `workers` workers
    pub fn new(workers: usize) -> Arc<Self> {
        Arc::new(Self {
            running: AtomicUsize::new(workers),
            ..Default::default()
        })
    }

    /// Record one finished batch
    pub fn record_batch(
        &self,
        bytes: usize,
        requests: usize,
        elapsed: Duration,
        since_start: Duration,
    ) {
        self.payload_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        self.busy_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        self.completed.fetch_add(requests as u64, Ordering::Relaxed);
        self.last_completion_nanos
            .store(since_start.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Number of workers still running
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Guard that marks one worker as finished when dropped, including when
    /// the worker unwinds.
    pub fn worker_guard(self: &Arc<Self>) -> RunningGuard {
        RunningGuard {
            counters: Arc::clone(self),
        }
    }

    /// Read all counters
    pub fn snapshot(&self) -> Snapshot {
        let running = self.running();
        Snapshot {
            payload_bytes: self.payload_bytes.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            busy: Duration::from_nanos(self.busy_nanos.load(Ordering::Relaxed)),
            last_completion: Duration::from_nanos(
                self.last_completion_nanos.load(Ordering::Relaxed),
            ),
            running,
        }
    }
}

/// Decrements the running count when dropped
#[derive(Debug)]
pub struct RunningGuard {
    counters: Arc<SharedCounters>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.counters.running.fetch_sub(1, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_batch() {
        let counters = SharedCounters::new(2);
        counters.record_batch(100, 10, Duration::from_millis(5), Duration::from_millis(20));
        counters.record_batch(50, 5, Duration::from_millis(3), Duration::from_millis(25));

        let snap = counters.snapshot();
        assert_eq!(snap.payload_bytes, 150);
        assert_eq!(snap.completed, 15);
        assert_eq!(snap.busy, Duration::from_millis(8));
        assert_eq!(snap.last_completion, Duration::from_millis(25));
        assert_eq!(snap.running, 2);
    }

    #[test]
    fn test_guard_decrements_running() {
        let counters = SharedCounters::new(2);
        let first = counters.worker_guard();
        let second = counters.worker_guard();
        drop(first);
        assert_eq!(counters.running(), 1);
        drop(second);
        assert_eq!(counters.running(), 0);
    }

    #[test]
    fn test_rate() {
        let snap = Snapshot {
            completed: 500,
            last_completion: Duration::from_millis(250),
            ..Default::default()
        };
        assert_eq!(snap.rate(), 2000.0);
        assert_eq!(Snapshot::default().rate(), 0.0);
    }

    #[test]
    fn test_concurrent_updates() {
        let counters = SharedCounters::new(8);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    let _guard = counters.worker_guard();
                    for _ in 0..1000 {
                        counters.record_batch(
                            3,
                            1,
                            Duration::from_nanos(1),
                            Duration::from_nanos(1),
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = counters.snapshot();
        assert_eq!(snap.running, 0);
        assert_eq!(snap.completed, 8000);
        assert_eq!(snap.payload_bytes, 24000);
    }
}
