//! The admission gate.
//!
//! # State machine (per `acquire`)
//! ```text
//! Start → CountCheck ─(count ≥ reject)──────────────→ Rejected(AtCapacity)
//!             │ count += 1
//!             ▼
//!          Counted ─(no blocking tier / permit free)─→ Admitted
//!             │ no permit
//!             ▼
//!         BlockWait ─(permit)────────────────────────→ Admitted
//!             │ timeout / closed / future dropped
//!             ▼
//!          count -= 1 ───────────────────────────────→ Rejected / cancelled
//! ```
//!
//! # Design Decisions
//! - The counter pair lives under one `std::sync::Mutex`, never held
//!   across an await
//! - The blocking tier is a separate FIFO `tokio::sync::Semaphore`; the
//!   wait happens outside the counter lock
//! - Release is RAII: the permit returns the semaphore slot first, then
//!   decrements the counter
//! - Block/reject totals are atomics read without the counter lock, so a
//!   snapshot is best-effort rather than a single atomic view

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::admission::scope::ScopeMatcher;
use crate::admission::stats::GateSnapshot;
use crate::admission::thresholds::Thresholds;
use crate::observability::metrics;

/// Why a request was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The reject threshold was already reached.
    AtCapacity,
    /// The configured blocking timeout elapsed before a slot freed up.
    WaitTimedOut,
    /// The gate was closed for shutdown.
    ShuttingDown,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::AtCapacity => "at_capacity",
            RejectReason::WaitTimedOut => "wait_timed_out",
            RejectReason::ShuttingDown => "shutting_down",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Gate::acquire`].
#[derive(Debug)]
#[must_use]
pub enum Admission {
    Admitted(AdmissionPermit),
    Rejected(RejectReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }

    pub fn into_permit(self) -> Option<AdmissionPermit> {
        match self {
            Admission::Admitted(permit) => Some(permit),
            Admission::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct InFlight {
    current: usize,
    high_water_mark: usize,
}

/// Bounds concurrently admitted requests.
#[derive(Debug)]
pub struct Gate {
    thresholds: Thresholds,
    scope: ScopeMatcher,
    in_flight: Mutex<InFlight>,
    blocking: Option<Arc<Semaphore>>,
    total_blocked: AtomicU64,
    total_rejected: AtomicU64,
    total_abandoned: AtomicU64,
    closed: AtomicBool,
}

impl Gate {
    /// Build a gate from resolved limits. The blocking semaphore only
    /// exists when the blocking tier is active.
    pub fn new(thresholds: Thresholds, scope: ScopeMatcher) -> Self {
        let blocking = thresholds
            .blocking_enabled()
            .then(|| Arc::new(Semaphore::new(thresholds.blocking())));

        Self {
            thresholds,
            scope,
            in_flight: Mutex::new(InFlight::default()),
            blocking,
            total_blocked: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
            total_abandoned: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// A gate that admits everything and has no scope.
    pub fn disabled() -> Self {
        Self::new(Thresholds::disabled(), ScopeMatcher::empty())
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn is_enabled(&self) -> bool {
        self.thresholds.is_enabled()
    }

    /// Whether requests to `path` go through the gate.
    pub fn is_in_scope(&self, path: &str) -> bool {
        self.is_enabled() && self.scope.is_in_scope(path)
    }

    /// Try to admit one request, waiting on the blocking tier if needed.
    ///
    /// Dropping the returned future while it waits undoes the count
    /// increment; the request is then simply not admitted.
    pub async fn acquire(self: &Arc<Self>) -> Admission {
        if !self.is_enabled() {
            return Admission::Admitted(AdmissionPermit::passthrough());
        }
        if self.closed.load(Ordering::Acquire) {
            metrics::record_rejected(RejectReason::ShuttingDown.as_str());
            return Admission::Rejected(RejectReason::ShuttingDown);
        }

        let mut slot = match self.enter() {
            Some(slot) => slot,
            None => return Admission::Rejected(RejectReason::AtCapacity),
        };

        let Some(semaphore) = self.blocking.as_ref().map(Arc::clone) else {
            slot.admitted = true;
            metrics::record_admitted();
            return Admission::Admitted(AdmissionPermit::counted(slot, None));
        };

        let permit = match Arc::clone(&semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return self.abandon(slot, RejectReason::ShuttingDown),
            Err(TryAcquireError::NoPermits) => {
                let total_blocked = self.total_blocked.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::record_blocked();
                tracing::info!(
                    event = "block",
                    concurrent_requests = slot.position,
                    total_blocked,
                    total_rejected = self.total_rejected.load(Ordering::Relaxed),
                    "Concurrent event"
                );

                let started = Instant::now();
                match self.wait_for_permit(semaphore).await {
                    Ok(permit) => {
                        metrics::record_block_wait(started.elapsed());
                        permit
                    }
                    Err(reason) => return self.abandon(slot, reason),
                }
            }
        };

        slot.admitted = true;
        metrics::record_admitted();
        Admission::Admitted(AdmissionPermit::counted(slot, Some(permit)))
    }

    async fn wait_for_permit(
        &self,
        semaphore: Arc<Semaphore>,
    ) -> Result<OwnedSemaphorePermit, RejectReason> {
        let acquire = semaphore.acquire_owned();
        match self.thresholds.blocking_timeout() {
            None => acquire.await.map_err(|_| RejectReason::ShuttingDown),
            Some(limit) => match tokio::time::timeout(limit, acquire).await {
                Ok(result) => result.map_err(|_| RejectReason::ShuttingDown),
                Err(_) => Err(RejectReason::WaitTimedOut),
            },
        }
    }

    /// CountCheck: reject at the threshold, otherwise count the request in.
    fn enter(self: &Arc<Self>) -> Option<CountedSlot> {
        let mut in_flight = self.lock_in_flight();
        if in_flight.current >= self.thresholds.reject() {
            let total_rejected = self.total_rejected.fetch_add(1, Ordering::Relaxed) + 1;
            let attempted = in_flight.current + 1;
            drop(in_flight);

            metrics::record_rejected(RejectReason::AtCapacity.as_str());
            tracing::info!(
                event = "reject",
                concurrent_requests = attempted,
                total_blocked = self.total_blocked.load(Ordering::Relaxed),
                total_rejected,
                "Concurrent event"
            );
            return None;
        }

        in_flight.current += 1;
        if in_flight.current > in_flight.high_water_mark {
            in_flight.high_water_mark = in_flight.current;
        }
        let position = in_flight.current;
        // Published under the lock so racing updates land in count order.
        metrics::set_concurrent_requests(position);
        drop(in_flight);

        Some(CountedSlot {
            gate: Arc::clone(self),
            position,
            admitted: false,
        })
    }

    fn abandon(&self, slot: CountedSlot, reason: RejectReason) -> Admission {
        drop(slot);
        metrics::record_rejected(reason.as_str());
        tracing::warn!(reason = %reason, "{}", not_admitted_message(reason));
        Admission::Rejected(reason)
    }

    /// Count one request out. Never drives the count below zero.
    fn leave(&self) {
        let mut in_flight = self.lock_in_flight();
        let Some(current) = in_flight.current.checked_sub(1) else {
            drop(in_flight);
            tracing::error!("Concurrent request count underflow: release without matching acquire");
            return;
        };
        in_flight.current = current;
        metrics::set_concurrent_requests(current);
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, InFlight> {
        // The pair is always left consistent, so a poisoned lock is still usable.
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop admitting and wake every blocked waiter as not admitted.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(semaphore) = &self.blocking {
            semaphore.close();
        }
        tracing::info!("Admission gate closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Current counters and limits.
    pub fn snapshot(&self) -> GateSnapshot {
        let (concurrent_requests, high_water_mark) = {
            let in_flight = self.lock_in_flight();
            (in_flight.current, in_flight.high_water_mark)
        };

        GateSnapshot {
            concurrent_requests,
            high_water_mark,
            total_blocked: self.total_blocked.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            total_abandoned: self.total_abandoned.load(Ordering::Relaxed),
            reject_threshold: self.thresholds.reject(),
            blocking_threshold: self.thresholds.blocking(),
            enabled: self.thresholds.is_enabled(),
            blocking_enabled: self.thresholds.blocking_enabled(),
        }
    }
}

fn not_admitted_message(reason: RejectReason) -> &'static str {
    match reason {
        RejectReason::AtCapacity => "Request not admitted: at capacity",
        RejectReason::WaitTimedOut => "Blocked request timed out waiting for a slot",
        RejectReason::ShuttingDown => "Request not admitted: gate closed",
    }
}

/// One unit of the in-flight count. Decrements on drop.
#[derive(Debug)]
struct CountedSlot {
    gate: Arc<Gate>,
    position: usize,
    admitted: bool,
}

impl Drop for CountedSlot {
    fn drop(&mut self) {
        if !self.admitted {
            self.gate.total_abandoned.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Admission wait abandoned");
        }
        self.gate.leave();
    }
}

/// Proof of admission. Dropping it (or calling [`release`]) frees the slot.
///
/// [`release`]: AdmissionPermit::release
#[derive(Debug)]
#[must_use = "dropping the permit releases the admission slot immediately"]
pub struct AdmissionPermit {
    // Field order is drop order: the semaphore slot goes back before the
    // count is decremented.
    blocking: Option<OwnedSemaphorePermit>,
    slot: Option<CountedSlot>,
}

impl AdmissionPermit {
    fn passthrough() -> Self {
        Self {
            blocking: None,
            slot: None,
        }
    }

    fn counted(slot: CountedSlot, blocking: Option<OwnedSemaphorePermit>) -> Self {
        Self {
            blocking,
            slot: Some(slot),
        }
    }

    /// Whether this admission was counted against the thresholds.
    pub fn is_counted(&self) -> bool {
        self.slot.is_some()
    }

    /// Whether this admission holds a blocking-tier slot.
    pub fn holds_blocking_slot(&self) -> bool {
        self.blocking.is_some()
    }

    /// Release the admission.
    pub fn release(self) {
        drop(self);
    }
}
