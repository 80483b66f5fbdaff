//! Observability and Metrics
//!
//! Counters for request/reply exchanges on a transport session.
//!
//! Uses atomic counters so a session can hand out `&Metrics` freely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector for one transport session
#[derive(Debug)]
pub struct Metrics {
    /// Requests handed to the socket
    pub requests_sent: AtomicU64,
    /// Replies decoded successfully
    pub replies_received: AtomicU64,
    /// Total bytes sent
    pub bytes_sent: AtomicU64,
    /// Total bytes received, IP header included
    pub bytes_received: AtomicU64,
    /// Send or receive failures reported by the socket
    pub transport_errors: AtomicU64,
    /// Received datagrams that failed to decode
    pub decode_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_sent: AtomicU64::new(0),
            replies_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request sent
    pub fn request_sent(&self, byte_count: u64) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a datagram received
    pub fn datagram_received(&self, byte_count: u64) {
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a reply decoded
    pub fn reply_received(&self) {
        self.replies_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transport error
    pub fn transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a decode error
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            replies_received: self.replies_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            requests_sent = snapshot.requests_sent,
            replies_received = snapshot.replies_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            transport_errors = snapshot.transport_errors,
            decode_errors = snapshot.decode_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "ICMP session metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_sent: u64,
    pub replies_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub transport_errors: u64,
    pub decode_errors: u64,
    pub uptime_seconds: u64,
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
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.request_sent(40);
        metrics.request_sent(12);
        metrics.datagram_received(60);
        metrics.reply_received();
        metrics.transport_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_sent, 2);
        assert_eq!(snapshot.bytes_sent, 52);
        assert_eq!(snapshot.bytes_received, 60);
        assert_eq!(snapshot.replies_received, 1);
        assert_eq!(snapshot.transport_errors, 1);
        assert_eq!(snapshot.decode_errors, 0);
    }
}
