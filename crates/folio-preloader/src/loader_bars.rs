//! Loader bar highlight that follows the climbing dot.

use std::sync::Arc;
use std::time::Duration;

use folio_core::config::{LOADER_BAR_ACTIVE, LOADER_BAR_IDLE};
use folio_core::ports::PageElement;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cycle position (percent) at which the dot leaves each bar.
const BAR_BOUNDARIES: [u128; 4] = [16, 34, 52, 70];

/// Index of the bar the dot sits on, `elapsed` into the animation.
pub fn active_bar(elapsed: Duration, cycle: Duration) -> usize {
    let cycle_ms = cycle.as_millis().max(1);
    let percent = (elapsed.as_millis() % cycle_ms) * 100 / cycle_ms;
    BAR_BOUNDARIES
        .iter()
        .position(|&boundary| percent < boundary)
        .unwrap_or(BAR_BOUNDARIES.len())
}

fn paint(bars: &[Arc<dyn PageElement>], active: Option<usize>) {
    for (i, bar) in bars.iter().enumerate() {
        let color = if Some(i) == active {
            LOADER_BAR_ACTIVE
        } else {
            LOADER_BAR_IDLE
        };
        bar.set_style("background", color);
    }
}

/// Repaint the bars every `tick` until cancelled.
///
/// Bars start idle; only changes of the active bar trigger a repaint.
pub async fn animate_loader_bars(
    bars: Vec<Arc<dyn PageElement>>,
    tick: Duration,
    cycle: Duration,
    cancel: CancellationToken,
) {
    if bars.is_empty() {
        debug!("No loader bars on page, skipping");
        return;
    }

    paint(&bars, None);
    let start = Instant::now();
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut current = None;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let active = active_bar(start.elapsed(), cycle);
                if current != Some(active) {
                    current = Some(active);
                    // Five positions; pages with fewer bars leave the rest unlit.
                    paint(&bars, (active < bars.len()).then_some(active));
                }
            }
        }
    }
}
