//! Process-wide conversion counters, reported by the detailed health
//! endpoint.
//!
//! Counters are relaxed atomics; the latency window sits behind a mutex and
//! only keeps the most recent successful conversions.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Successful conversions kept for latency percentiles.
const LATENCY_WINDOW: usize = 1000;

/// Shared by the dispatcher and the packager of one server.
#[derive(Debug, Default)]
pub struct ConversionMetrics {
    batches: AtomicU64,
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    rejected: AtomicU64,
    archives: AtomicU64,
    input_bytes: AtomicU64,
    output_bytes: AtomicU64,
    latencies: Mutex<VecDeque<Duration>>,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

fn read(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

impl ConversionMetrics {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch got past request validation.
    pub fn record_batch(&self) {
        bump(&self.batches, 1);
    }

    /// A file was handed to its converter.
    pub fn record_started(&self, input_bytes: u64) {
        bump(&self.started, 1);
        bump(&self.input_bytes, input_bytes);
    }

    /// A file converted in `elapsed`, producing `output_bytes`.
    pub fn record_success(&self, elapsed: Duration, output_bytes: u64) {
        bump(&self.succeeded, 1);
        bump(&self.output_bytes, output_bytes);

        if let Ok(mut window) = self.latencies.lock() {
            if window.len() == LATENCY_WINDOW {
                window.pop_front();
            }
            window.push_back(elapsed);
        }
    }

    /// A converter reported an error.
    pub fn record_failure(&self) {
        bump(&self.failed, 1);
    }

    /// A converter ran out of time. Also counted as a failure.
    pub fn record_timeout(&self) {
        bump(&self.timed_out, 1);
        bump(&self.failed, 1);
    }

    /// A file was refused for its extension.
    pub fn record_rejection(&self) {
        bump(&self.rejected, 1);
    }

    /// A result archive was written.
    pub fn record_archive(&self) {
        bump(&self.archives, 1);
    }

    /// Current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let latency = self
            .latencies
            .lock()
            .map(|window| LatencySummary::of(&window))
            .unwrap_or_default();

        MetricsSnapshot {
            batches: read(&self.batches),
            conversions_started: read(&self.started),
            conversions_succeeded: read(&self.succeeded),
            conversions_failed: read(&self.failed),
            conversions_timed_out: read(&self.timed_out),
            extension_rejections: read(&self.rejected),
            archives_built: read(&self.archives),
            total_input_bytes: read(&self.input_bytes),
            total_output_bytes: read(&self.output_bytes),
            latency,
        }
    }
}

/// Point-in-time copy of [`ConversionMetrics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub batches: u64,
    pub conversions_started: u64,
    pub conversions_succeeded: u64,
    /// Includes timeouts.
    pub conversions_failed: u64,
    pub conversions_timed_out: u64,
    pub extension_rejections: u64,
    pub archives_built: u64,
    pub total_input_bytes: u64,
    pub total_output_bytes: u64,
    pub latency: LatencySummary,
}

/// Nearest-rank percentiles over the latency window, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub samples: usize,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

impl LatencySummary {
    fn of(window: &VecDeque<Duration>) -> Self {
        let mut millis: Vec<u64> = window.iter().map(|d| d.as_millis() as u64).collect();
        millis.sort_unstable();

        let rank = |pct: usize| -> Option<u64> {
            let n = (pct * millis.len()).div_ceil(100);
            n.checked_sub(1).and_then(|i| millis.get(i)).copied()
        };

        Self {
            samples: millis.len(),
            p50_ms: rank(50),
            p95_ms: rank(95),
            p99_ms: rank(99),
        }
    }
}
