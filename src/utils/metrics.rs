//! Observability and Metrics
//!
//! Counters for packet framing and handshake gating, so operators can see
//! dropped datagrams, contended handshakes and gate expiries.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector for framing and gating operations
#[derive(Debug)]
pub struct Metrics {
    /// Packets written by the datagram codec
    pub packets_encoded: AtomicU64,
    /// Packets parsed by the datagram codec
    pub packets_decoded: AtomicU64,
    /// Datagrams discarded as foreign or truncated
    pub datagrams_dropped: AtomicU64,
    /// Packets sealed with a cipher
    pub packets_sealed: AtomicU64,
    /// Packets opened with a cipher
    pub packets_opened: AtomicU64,
    /// Packets whose ciphertext failed authentication
    pub open_failures: AtomicU64,
    /// Permits handed out by gates
    pub gate_acquisitions: AtomicU64,
    /// Acquisitions that had to wait for a permit
    pub gate_contended: AtomicU64,
    /// Permits returned by the default hold timer
    pub auto_releases: AtomicU64,
    /// Permits returned by a caller-supplied hold timer
    pub custom_releases: AtomicU64,
    /// Holds switched to a caller-supplied delay
    pub hold_extensions: AtomicU64,
    /// Extension requests that found nothing held
    pub spurious_extensions: AtomicU64,
    /// Holds abandoned at dispose time
    pub disposed_holds: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            packets_encoded: AtomicU64::new(0),
            packets_decoded: AtomicU64::new(0),
            datagrams_dropped: AtomicU64::new(0),
            packets_sealed: AtomicU64::new(0),
            packets_opened: AtomicU64::new(0),
            open_failures: AtomicU64::new(0),
            gate_acquisitions: AtomicU64::new(0),
            gate_contended: AtomicU64::new(0),
            auto_releases: AtomicU64::new(0),
            custom_releases: AtomicU64::new(0),
            hold_extensions: AtomicU64::new(0),
            spurious_extensions: AtomicU64::new(0),
            disposed_holds: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn packet_encoded(&self) {
        self.packets_encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packet_decoded(&self) {
        self.packets_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn datagram_dropped(&self) {
        self.datagrams_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packet_sealed(&self) {
        self.packets_sealed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packet_opened(&self) {
        self.packets_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn open_failed(&self) {
        self.open_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a permit handed out, and whether the caller had to wait for it
    pub fn gate_acquired(&self, contended: bool) {
        self.gate_acquisitions.fetch_add(1, Ordering::Relaxed);
        if contended {
            self.gate_contended.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn auto_released(&self) {
        self.auto_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn custom_released(&self) {
        self.custom_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hold_extended(&self) {
        self.hold_extensions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn spurious_extension(&self) {
        self.spurious_extensions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn holds_disposed(&self, count: u64) {
        self.disposed_holds.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_encoded: self.packets_encoded.load(Ordering::Relaxed),
            packets_decoded: self.packets_decoded.load(Ordering::Relaxed),
            datagrams_dropped: self.datagrams_dropped.load(Ordering::Relaxed),
            packets_sealed: self.packets_sealed.load(Ordering::Relaxed),
            packets_opened: self.packets_opened.load(Ordering::Relaxed),
            open_failures: self.open_failures.load(Ordering::Relaxed),
            gate_acquisitions: self.gate_acquisitions.load(Ordering::Relaxed),
            gate_contended: self.gate_contended.load(Ordering::Relaxed),
            auto_releases: self.auto_releases.load(Ordering::Relaxed),
            custom_releases: self.custom_releases.load(Ordering::Relaxed),
            hold_extensions: self.hold_extensions.load(Ordering::Relaxed),
            spurious_extensions: self.spurious_extensions.load(Ordering::Relaxed),
            disposed_holds: self.disposed_holds.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            packets_encoded = snapshot.packets_encoded,
            packets_decoded = snapshot.packets_decoded,
            datagrams_dropped = snapshot.datagrams_dropped,
            packets_sealed = snapshot.packets_sealed,
            packets_opened = snapshot.packets_opened,
            open_failures = snapshot.open_failures,
            gate_acquisitions = snapshot.gate_acquisitions,
            gate_contended = snapshot.gate_contended,
            auto_releases = snapshot.auto_releases,
            custom_releases = snapshot.custom_releases,
            hold_extensions = snapshot.hold_extensions,
            spurious_extensions = snapshot.spurious_extensions,
            disposed_holds = snapshot.disposed_holds,
            uptime_seconds = snapshot.uptime_seconds,
            "Voice metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_encoded: u64,
    pub packets_decoded: u64,
    pub datagrams_dropped: u64,
    pub packets_sealed: u64,
    pub packets_opened: u64,
    pub open_failures: u64,
    pub gate_acquisitions: u64,
    pub gate_contended: u64,
    pub auto_releases: u64,
    pub custom_releases: u64,
    pub hold_extensions: u64,
    pub spurious_extensions: u64,
    pub disposed_holds: u64,
    pub uptime_seconds: u64,
}

/// Process-wide metrics instance
static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the process-wide metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
