//! Read-only view of the gate counters for status endpoints.

use serde::Serialize;

/// Point-in-time counters and limits of a [`Gate`](crate::admission::Gate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateSnapshot {
    /// Requests currently counted in (running or waiting for a slot).
    pub concurrent_requests: usize,
    /// Highest `concurrent_requests` seen since startup.
    pub high_water_mark: usize,
    /// Admissions that had to wait for a blocking-tier slot.
    pub total_blocked: u64,
    /// Admissions refused at the reject threshold.
    pub total_rejected: u64,
    /// Waits that ended without admission (cancelled, timed out, shutdown).
    pub total_abandoned: u64,
    pub reject_threshold: usize,
    pub blocking_threshold: usize,
    pub enabled: bool,
    pub blocking_enabled: bool,
}
