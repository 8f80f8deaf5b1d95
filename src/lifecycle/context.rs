//! Process-wide service state, passed explicitly to every request path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::admission::{Gate, ScopeMatcher, Thresholds};
use crate::config::AdmissionSettings;
use crate::lifecycle::startup::StartupError;

/// State shared by the HTTP layer for the life of the process.
///
/// Holds the admission gate, which can be configured exactly once.
#[derive(Debug)]
pub struct ServiceContext {
    started_at: Instant,
    request_count: AtomicU64,
    shutting_down: AtomicBool,
    gate: OnceLock<Arc<Gate>>,
}

impl ServiceContext {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            request_count: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
            gate: OnceLock::new(),
        }
    }

    /// Resolve the admission settings and install the gate.
    ///
    /// Fails with [`StartupError::AlreadyInitialized`] on any call after
    /// the first successful one; the installed gate is never replaced.
    pub fn configure_gate(&self, settings: &AdmissionSettings) -> Result<Arc<Gate>, StartupError> {
        if self.gate.get().is_some() {
            return Err(StartupError::AlreadyInitialized);
        }

        let thresholds = Thresholds::resolve(settings)?;
        let scope = ScopeMatcher::compile(&settings.uri_patterns, thresholds.is_enabled())?;
        let gate = Arc::new(Gate::new(thresholds, scope));

        self.gate
            .set(Arc::clone(&gate))
            .map_err(|_| StartupError::AlreadyInitialized)?;

        tracing::info!(
            enabled = thresholds.is_enabled(),
            reject_threshold = thresholds.reject(),
            blocking_threshold = thresholds.blocking(),
            blocking_enabled = thresholds.blocking_enabled(),
            "Admission gate configured"
        );
        Ok(gate)
    }

    /// The configured gate, if any.
    pub fn gate(&self) -> Option<&Arc<Gate>> {
        self.gate.get()
    }

    /// Count one incoming request; returns the new total.
    pub fn record_request(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Mark the service as draining and close the gate.
    pub fn begin_shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(gate) = self.gate.get() {
            gate.close();
        }
        tracing::info!("Service shutting down");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self::new()
    }
}
