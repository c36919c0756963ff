//! # Progress — Atomic Scan Progress Counters
//!
//! Counters shared between the scan loop (and its rayon workers) and a
//! background reporter thread. Atomics for the counters; a Mutex only for the
//! human-readable description of the current block, which changes once per
//! block rather than once per candidate.
//!
//! The reporter logs a `scan progress` event every `interval` until `stop()`
//! is called.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

pub struct Progress {
    pub tested: AtomicU64,
    pub maxima: AtomicU64,
    pub current: Mutex<String>,
    total: u64,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new(total: u64) -> Arc<Self> {
        Arc::new(Progress {
            tested: AtomicU64::new(0),
            maxima: AtomicU64::new(0),
            current: Mutex::new(String::new()),
            total,
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn set_current(&self, description: String) {
        if let Ok(mut current) = self.current.lock() {
            *current = description;
        }
    }

    pub fn start_reporter(self: &Arc<Self>, interval: Duration) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || {
            let tick = Duration::from_millis(200).min(interval);
            let mut since_report = Duration::ZERO;
            while !progress.shutdown.load(Ordering::Relaxed) {
                thread::sleep(tick);
                since_report += tick;
                if since_report >= interval {
                    since_report = Duration::ZERO;
                    progress.print_status();
                }
            }
        })
    }

    pub fn print_status(&self) {
        let elapsed = self.start.elapsed();
        let tested = self.tested.load(Ordering::Relaxed);
        let maxima = self.maxima.load(Ordering::Relaxed);
        let current = self
            .current
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default();
        let rate = if elapsed.as_secs() > 0 {
            tested as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let percent = if self.total > 0 {
            tested as f64 / self.total as f64 * 100.0
        } else {
            0.0
        };
        let h = elapsed.as_secs() / 3600;
        let m = (elapsed.as_secs() % 3600) / 60;
        let s = elapsed.as_secs() % 60;
        info!(
            current = %current,
            tested,
            total = self.total,
            percent = format_args!("{:.1}", percent),
            rate = format_args!("{:.2}", rate),
            maxima,
            elapsed = format_args!("{:02}:{:02}:{:02}", h, m, s),
            "scan progress"
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    //! Tests for the atomic scan counters and the background reporter.
    //!
    //! Rayon workers bump `tested` concurrently, so the concurrent test checks
    //! that no increments are lost. The reporter must exit promptly after
    //! `stop()` even with a long reporting interval.

    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let p = Progress::new(5000);
        assert_eq!(p.tested.load(Ordering::Relaxed), 0);
        assert_eq!(p.maxima.load(Ordering::Relaxed), 0);
        assert_eq!(*p.current.lock().unwrap(), "");
        assert_eq!(p.total(), 5000);
    }

    #[test]
    fn set_current_replaces_description() {
        let p = Progress::new(10);
        p.set_current("n=[105001..105127]".to_string());
        assert_eq!(*p.current.lock().unwrap(), "n=[105001..105127]");
    }

    /// 8 threads x 1000 increments must total exactly 8000.
    #[test]
    fn concurrent_increments_are_accurate() {
        let p = Progress::new(8000);
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        p.tested.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(p.tested.load(Ordering::Relaxed), 8000);
    }

    #[test]
    fn reporter_exits_after_stop() {
        let p = Progress::new(1);
        let handle = p.start_reporter(Duration::from_secs(3600));
        p.stop();
        handle.join().unwrap();
    }

    /// Zero total and zero elapsed time must not divide by zero.
    #[test]
    fn print_status_does_not_panic() {
        let p = Progress::new(0);
        p.print_status();
        p.tested.fetch_add(100, Ordering::Relaxed);
        p.maxima.fetch_add(2, Ordering::Relaxed);
        p.print_status();
    }
}
