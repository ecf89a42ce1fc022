//! Staged loading message.

use std::sync::Arc;
use std::time::Duration;

use folio_core::ports::{LoadingMessage, PageElement};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const SHOW: &str = "show";

/// When each line appears, relative to the container reveal.
///
/// Part-one lines use their own delay; part-two lines start `second_delay`
/// later. Sorted by offset, ties in document order.
pub fn reveal_schedule(
    message: &LoadingMessage,
    second_delay: Duration,
) -> Vec<(Duration, Arc<dyn PageElement>)> {
    let first = message
        .part_one
        .iter()
        .map(|line| (line.delay(), Arc::clone(&line.element)));
    let second = message.part_two.iter().filter_map(|line| {
        let offset = second_delay.checked_add(line.delay());
        if offset.is_none() {
            warn!("Message line delay out of range, skipping");
        }
        offset.map(|offset| (offset, Arc::clone(&line.element)))
    });

    let mut schedule: Vec<_> = first.chain(second).collect();
    schedule.sort_by_key(|(offset, _)| *offset);
    schedule
}

/// Reveal the message container `reveal_after` past `started_at`, then its
/// lines on schedule. Stops early when `cancel` fires.
pub async fn stage_messages(
    message: Option<LoadingMessage>,
    started_at: Instant,
    reveal_after: Duration,
    second_delay: Duration,
    cancel: CancellationToken,
) {
    let Some(message) = message else {
        debug!("No loading message on page, skipping");
        return;
    };

    let Some(shown_at) = started_at.checked_add(reveal_after) else {
        warn!(?reveal_after, "Loading message reveal time out of range, skipping");
        return;
    };
    tokio::select! {
        () = cancel.cancelled() => return,
        () = sleep_until(shown_at) => {}
    }
    if !message.container.has_class(SHOW) {
        message.container.add_class(SHOW);
        info!("Loading message shown");
    }

    for (offset, element) in reveal_schedule(&message, second_delay) {
        let Some(due) = shown_at.checked_add(offset) else {
            warn!(?offset, "Message line reveal time out of range, skipping");
            continue;
        };
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Loading message stopped");
                return;
            }
            () = sleep_until(due) => element.add_class(SHOW),
        }
    }
}
