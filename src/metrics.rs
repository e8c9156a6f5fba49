//! Prometheus-compatible metrics
//!
//! Counters for the score/save backend, exposed as Prometheus text at
//! `/metrics` and as JSON at `/metrics/json`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Samples kept for latency percentiles
const LATENCY_WINDOW: usize = 1000;

/// Metrics registry for the backend
#[derive(Debug)]
pub struct Metrics {
    // Requests
    pub requests_total: AtomicU64,
    pub requests_failed: AtomicU64,
    pub validation_failures: AtomicU64,
    pub not_found: AtomicU64,
    pub db_errors: AtomicU64,

    // Domain
    pub scores_created: AtomicU64,
    pub scores_updated: AtomicU64,
    pub scores_deleted: AtomicU64,
    pub leaderboard_reads: AtomicU64,
    pub saves_upserted: AtomicU64,
    pub saves_loaded: AtomicU64,
    pub saves_deleted: AtomicU64,

    // Request latency (microseconds)
    pub latency_us: AtomicU64,
    pub latency_p95_us: AtomicU64,
    pub latency_p99_us: AtomicU64,
    pub latency_max_us: AtomicU64,

    start_time: Instant,

    latency_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            db_errors: AtomicU64::new(0),
            scores_created: AtomicU64::new(0),
            scores_updated: AtomicU64::new(0),
            scores_deleted: AtomicU64::new(0),
            leaderboard_reads: AtomicU64::new(0),
            saves_upserted: AtomicU64::new(0),
            saves_loaded: AtomicU64::new(0),
            saves_deleted: AtomicU64::new(0),
            latency_us: AtomicU64::new(0),
            latency_p95_us: AtomicU64::new(0),
            latency_p99_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            start_time: Instant::now(),
            latency_history: RwLock::new(VecDeque::with_capacity(LATENCY_WINDOW)),
        }
    }

    #[inline]
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one handled request and update latency percentiles
    pub fn record_request(&self, duration: Duration, success: bool) {
        let us = duration.as_micros() as u64;
        self.latency_us.store(us, Ordering::Relaxed);
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }

        let mut history = self.latency_history.write();
        history.push_back(us);
        while history.len() > LATENCY_WINDOW {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.latency_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.latency_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.latency_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("pukul_tikus_requests_total", "Total HTTP requests handled", "counter",
            self.requests_total.load(Ordering::Relaxed));
        metric!("pukul_tikus_requests_failed_total", "Requests answered with an error status", "counter",
            self.requests_failed.load(Ordering::Relaxed));
        metric!("pukul_tikus_validation_failures_total", "Rejected request bodies", "counter",
            self.validation_failures.load(Ordering::Relaxed));
        metric!("pukul_tikus_not_found_total", "Lookups for missing records", "counter",
            self.not_found.load(Ordering::Relaxed));
        metric!("pukul_tikus_db_errors_total", "Database errors", "counter",
            self.db_errors.load(Ordering::Relaxed));

        metric!("pukul_tikus_scores_created_total", "Scores submitted", "counter",
            self.scores_created.load(Ordering::Relaxed));
        metric!("pukul_tikus_scores_updated_total", "Scores updated", "counter",
            self.scores_updated.load(Ordering::Relaxed));
        metric!("pukul_tikus_scores_deleted_total", "Scores deleted", "counter",
            self.scores_deleted.load(Ordering::Relaxed));
        metric!("pukul_tikus_leaderboard_reads_total", "Leaderboard and highscore reads", "counter",
            self.leaderboard_reads.load(Ordering::Relaxed));
        metric!("pukul_tikus_saves_upserted_total", "Save snapshots written", "counter",
            self.saves_upserted.load(Ordering::Relaxed));
        metric!("pukul_tikus_saves_loaded_total", "Save snapshots read", "counter",
            self.saves_loaded.load(Ordering::Relaxed));
        metric!("pukul_tikus_saves_deleted_total", "Save snapshots deleted", "counter",
            self.saves_deleted.load(Ordering::Relaxed));

        metric!("pukul_tikus_request_latency_microseconds", "Last request latency", "gauge",
            self.latency_us.load(Ordering::Relaxed));
        metric!("pukul_tikus_request_latency_p95_microseconds", "95th percentile request latency", "gauge",
            self.latency_p95_us.load(Ordering::Relaxed));
        metric!("pukul_tikus_request_latency_p99_microseconds", "99th percentile request latency", "gauge",
            self.latency_p99_us.load(Ordering::Relaxed));
        metric!("pukul_tikus_request_latency_max_microseconds", "Maximum request latency in window", "gauge",
            self.latency_max_us.load(Ordering::Relaxed));

        metric!("pukul_tikus_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        format!(r#"{{
  "requests": {{
    "total": {},
    "failed": {},
    "validation_failures": {},
    "not_found": {},
    "db_errors": {}
  }},
  "scores": {{
    "created": {},
    "updated": {},
    "deleted": {},
    "leaderboard_reads": {}
  }},
  "saves": {{
    "upserted": {},
    "loaded": {},
    "deleted": {}
  }},
  "latency": {{
    "last_us": {},
    "p95_us": {},
    "p99_us": {},
    "max_us": {}
  }},
  "uptime_seconds": {}
}}"#,
            self.requests_total.load(Ordering::Relaxed),
            self.requests_failed.load(Ordering::Relaxed),
            self.validation_failures.load(Ordering::Relaxed),
            self.not_found.load(Ordering::Relaxed),
            self.db_errors.load(Ordering::Relaxed),
            self.scores_created.load(Ordering::Relaxed),
            self.scores_updated.load(Ordering::Relaxed),
            self.scores_deleted.load(Ordering::Relaxed),
            self.leaderboard_reads.load(Ordering::Relaxed),
            self.saves_upserted.load(Ordering::Relaxed),
            self.saves_loaded.load(Ordering::Relaxed),
            self.saves_deleted.load(Ordering::Relaxed),
            self.latency_us.load(Ordering::Relaxed),
            self.latency_p95_us.load(Ordering::Relaxed),
            self.latency_p99_us.load(Ordering::Relaxed),
            self.latency_max_us.load(Ordering::Relaxed),
            self.uptime_seconds(),
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
