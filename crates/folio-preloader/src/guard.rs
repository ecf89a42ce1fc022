//! Timeout guard and signal combinators.
//!
//! Losing branches are dropped, not left running: a guarded signal that
//! times out releases its listeners, and a signal that wins cancels the
//! guard's timer.

use std::future::Future;
use std::time::Duration;

use folio_core::{ReadinessState, Settled};
use futures_util::future::join_all;
use tokio::time::timeout;
use tracing::warn;

use crate::readiness::ReadinessSignal;

/// Forces a readiness outcome after a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutGuard {
    limit: Duration,
}

impl TimeoutGuard {
    pub const fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub const fn limit(&self) -> Duration {
        self.limit
    }

    /// Resolve with `signal`'s outcome, or `TimedOut` once the limit passes.
    pub async fn guard<F>(&self, signal: F) -> ReadinessState
    where
        F: Future<Output = ReadinessState>,
    {
        if let Ok(state) = timeout(self.limit, signal).await {
            state
        } else {
            warn!(limit = ?self.limit, "Guarded wait timed out, proceeding");
            ReadinessState::TimedOut
        }
    }
}

/// Shorthand for `TimeoutGuard::new(limit).guard(signal)`.
pub async fn with_timeout<F>(signal: F, limit: Duration) -> ReadinessState
where
    F: Future<Output = ReadinessState>,
{
    TimeoutGuard::new(limit).guard(signal).await
}

/// First of two futures to resolve. Ties go to `left`.
pub async fn race<L, R, T>(left: L, right: R) -> T
where
    L: Future<Output = T>,
    R: Future<Output = T>,
{
    tokio::select! {
        biased;
        value = left => value,
        value = right => value,
    }
}

/// Wait for every signal to settle, in input order.
pub async fn all_settled<I>(signals: I) -> Vec<Settled>
where
    I: IntoIterator<Item = ReadinessSignal>,
{
    join_all(signals).await
}
