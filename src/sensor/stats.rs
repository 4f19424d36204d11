//! Ingest counters.
//!
//! Tracks how much traffic the ingest endpoint has seen since start-up
//! without keeping any of the messages themselves.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current relay process.
#[derive(Debug)]
pub struct IngestStats {
    /// Sensor connections accepted
    connections: AtomicU64,
    /// Messages that updated the reading
    accepted: AtomicU64,
    /// Messages discarded by the mapper
    rejected: AtomicU64,
    /// Process start time
    started_at: DateTime<Utc>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self {
            connections: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current counter values.
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            connections: self.connections.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// One-line summary for the shutdown log.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "connections={} accepted={} rejected={} uptime={}s",
            stats.connections, stats.accepted, stats.rejected, stats.uptime_secs
        )
    }
}

impl Default for IngestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Serialize)]
pub struct IngestStatsSnapshot {
    pub connections: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedIngestStats = Arc<IngestStats>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = IngestStats::new();
        stats.record_connection();
        stats.record_accepted();
        stats.record_accepted();
        stats.record_rejected();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.connections, 1);
        assert_eq!(snapshot.accepted, 2);
        assert_eq!(snapshot.rejected, 1);
    }

    #[test]
    fn test_summary_format() {
        let stats = IngestStats::new();
        stats.record_rejected();
        let summary = stats.summary();
        assert!(summary.contains("accepted=0"));
        assert!(summary.contains("rejected=1"));
    }
}
