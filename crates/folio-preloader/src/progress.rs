//! Simulated progress bar.

use std::sync::Arc;
use std::time::Duration;

use folio_core::ports::PageElement;
use folio_core::PreloaderSession;
use rand::Rng;
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Advances the session's progress by a random step every tick.
///
/// The bar only reflects time passing; readiness never feeds it. Values stay
/// under the session cap until the completion routine finishes the meter.
pub struct ProgressTicker<R> {
    session: Arc<PreloaderSession>,
    bar: Option<Arc<dyn PageElement>>,
    tick: Duration,
    max_increment: f64,
    rng: R,
}

impl<R: Rng + Send + 'static> ProgressTicker<R> {
    pub fn new(
        session: Arc<PreloaderSession>,
        bar: Option<Arc<dyn PageElement>>,
        tick: Duration,
        max_increment: f64,
        rng: R,
    ) -> Self {
        Self {
            session,
            bar,
            tick,
            max_increment,
            rng,
        }
    }

    /// Tick until cancelled. The first tick lands one period after session start.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = interval_at(self.session.started_at() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(progress = self.session.progress().value(), "Progress ticker stopped");
                    break;
                }
                _ = ticker.tick() => self.step(),
            }
        }
    }

    fn step(&mut self) {
        let delta = self.rng.random_range(0.0..self.max_increment);
        let value = self.session.progress().advance(delta);
        trace!(delta, value, "Progress tick");
        if let Some(bar) = &self.bar {
            bar.set_style("width", &format!("{value}%"));
        }
    }
}
