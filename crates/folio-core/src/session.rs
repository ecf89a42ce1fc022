//! Preloader session state.
//!
//! One [`PreloaderSession`] exists per page lifetime. It owns the progress
//! value, the completion latch, the pending-resource set and the selector
//! state. Every settle path funnels through [`PreloaderSession::try_complete`],
//! which hands out exactly one [`CompletionTicket`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::resource::{ReadinessState, ResourceHandle, ResourceId};

/// Priority Path Selector states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorState {
    NoPriorityResource,
    AwaitingPriority,
    PriorityReady,
    FallbackAggregate,
    Settled,
}

impl SelectorState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Settled)
    }
}

/// Which branch the selector took at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorPath {
    /// Hero video present: wait on it and the page load event.
    Priority,
    /// No hero video: wait on the page load event and every resource.
    Aggregate,
}

/// What completed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum SettleTrigger {
    /// Hero video settled (in `hero`) and the page loaded.
    Priority { hero: ReadinessState },
    /// Page loaded and every aggregated resource settled.
    Aggregate { ready: usize, degraded: usize },
    /// The global deadline elapsed first.
    GlobalFallback,
}

impl fmt::Display for SettleTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Priority { hero } => write!(f, "priority path (hero {hero})"),
            Self::Aggregate { ready, degraded } => {
                write!(f, "aggregate path ({ready} ready, {degraded} degraded)")
            }
            Self::GlobalFallback => f.write_str("global fallback"),
        }
    }
}

/// Proof of having won the completion latch.
///
/// Not `Clone`: exactly one ticket exists per session.
#[derive(Debug)]
pub struct CompletionTicket {
    trigger: SettleTrigger,
    settled_after: Duration,
}

impl CompletionTicket {
    pub const fn trigger(&self) -> SettleTrigger {
        self.trigger
    }

    /// Time from session start to the winning settle.
    pub const fn settled_after(&self) -> Duration {
        self.settled_after
    }
}

/// One-shot guard around the terminal transition.
#[derive(Debug, Default)]
pub struct CompletionLatch {
    fired: AtomicBool,
}

impl CompletionLatch {
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Set the latch. Only the first caller receives a ticket.
    pub fn try_acquire(
        &self,
        trigger: SettleTrigger,
        settled_after: Duration,
    ) -> Option<CompletionTicket> {
        self.fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| CompletionTicket {
                trigger,
                settled_after,
            })
    }

    pub fn is_set(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Progress percentage: monotonic, capped until completion.
#[derive(Debug)]
pub struct ProgressMeter {
    bits: AtomicU64,
    cap: f64,
}

impl ProgressMeter {
    pub const COMPLETE: f64 = 100.0;

    pub const fn new(cap: f64) -> Self {
        Self {
            bits: AtomicU64::new(0),
            cap,
        }
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }

    /// Add `delta` percent, never passing the cap and never going backwards.
    ///
    /// Returns the value after the update.
    pub fn advance(&self, delta: f64) -> f64 {
        if !(delta.is_finite() && delta > 0.0) {
            return self.value();
        }
        let cap = self.cap;
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                let current = f64::from_bits(bits);
                let next = (current + delta).min(cap);
                (next > current).then_some(next.to_bits())
            });
        self.value()
    }

    /// Jump to 100%. Requires the completion ticket.
    pub fn finish(&self, _ticket: &CompletionTicket) -> f64 {
        self.bits.store(Self::COMPLETE.to_bits(), Ordering::SeqCst);
        Self::COMPLETE
    }
}

/// Process-wide state of one preloader run.
#[derive(Debug)]
pub struct PreloaderSession {
    started_at: Instant,
    started_wall: DateTime<Utc>,
    progress: ProgressMeter,
    latch: CompletionLatch,
    pending: Mutex<BTreeMap<ResourceId, String>>,
    state: watch::Sender<SelectorState>,
}

impl PreloaderSession {
    /// Start a session now.
    pub fn new(progress_cap: f64, initial: SelectorState) -> Self {
        let (state, _) = watch::channel(initial);
        let session = Self {
            started_at: Instant::now(),
            started_wall: Utc::now(),
            progress: ProgressMeter::new(progress_cap),
            latch: CompletionLatch::new(),
            pending: Mutex::new(BTreeMap::new()),
            state,
        };
        debug!(started_at = %session.started_wall, ?initial, "Preloader session started");
        session
    }

    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    pub const fn started_wall(&self) -> DateTime<Utc> {
        self.started_wall
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub const fn progress(&self) -> &ProgressMeter {
        &self.progress
    }

    pub fn is_completed(&self) -> bool {
        self.latch.is_set()
    }

    /// Settle handler entry point.
    ///
    /// Checks and sets the latch without awaiting. The first caller gets the
    /// ticket and moves the selector to `Settled`; later callers get `None`.
    pub fn try_complete(&self, trigger: SettleTrigger) -> Option<CompletionTicket> {
        let elapsed = self.elapsed();
        let Some(ticket) = self.latch.try_acquire(trigger, elapsed) else {
            debug!(%trigger, ?elapsed, "Settle ignored, preloader already completing");
            return None;
        };
        self.transition(SelectorState::Settled);
        info!(%trigger, ?elapsed, "Preloader settled");
        Some(ticket)
    }

    pub fn state(&self) -> SelectorState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SelectorState> {
        self.state.subscribe()
    }

    /// Move the selector to `next`. `Settled` is terminal.
    pub fn transition(&self, next: SelectorState) {
        self.state.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            debug!(from = ?*current, to = ?next, "Selector state changed");
            *current = next;
            true
        });
    }

    /// Record a resource as pending.
    pub fn track(&self, handle: &ResourceHandle) {
        self.pending_set()
            .insert(handle.id(), handle.label().to_string());
    }

    /// Remove a settled resource from the pending set.
    pub fn untrack(&self, id: ResourceId) {
        self.pending_set().remove(&id);
    }

    /// Labels of resources still pending, in enumeration order.
    pub fn pending_labels(&self) -> Vec<String> {
        self.pending_set().values().cloned().collect()
    }

    fn pending_set(&self) -> MutexGuard<'_, BTreeMap<ResourceId, String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
