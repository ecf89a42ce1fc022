//! Simulated loadable resources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use folio_core::ports::{FontSet, MediaElement, MediaEvent, StyleSheet, StyleSheetAccessError};
use folio_core::{LoadProgress, MediaReadyState};
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, sleep_until};
use tracing::trace;

use crate::scenario::MediaStep;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy)]
struct MediaState {
    progress: LoadProgress,
    ready_state: MediaReadyState,
}

impl MediaState {
    /// The state a real element would be in after dispatching `event`.
    fn after(mut self, event: &MediaEvent) -> Self {
        let floor = match event {
            MediaEvent::Load => {
                self.progress = LoadProgress::Loaded;
                MediaReadyState::HaveEnoughData
            }
            MediaEvent::Error { .. } => {
                self.progress = LoadProgress::Errored;
                return self;
            }
            MediaEvent::LoadedMetadata => MediaReadyState::HaveMetadata,
            MediaEvent::LoadedData => MediaReadyState::HaveCurrentData,
            MediaEvent::CanPlay => MediaReadyState::HaveFutureData,
            MediaEvent::CanPlayThrough => MediaReadyState::HaveEnoughData,
            MediaEvent::Progress => MediaReadyState::HaveNothing,
        };
        if self.progress == LoadProgress::Idle {
            self.progress = LoadProgress::Loading;
        }
        self.ready_state = self.ready_state.max(floor);
        self
    }
}

/// An image, video or preload link driven by a scripted timeline.
#[derive(Debug)]
pub struct SimMedia {
    label: String,
    source: Option<String>,
    state: Mutex<MediaState>,
    events: broadcast::Sender<MediaEvent>,
    begin_load_calls: AtomicUsize,
}

impl SimMedia {
    pub fn new(
        label: impl Into<String>,
        source: Option<String>,
        progress: LoadProgress,
        ready_state: MediaReadyState,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            label: label.into(),
            source,
            state: Mutex::new(MediaState {
                progress,
                ready_state,
            }),
            events,
            begin_load_calls: AtomicUsize::new(0),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Dispatch `event`, updating state first as the browser does.
    pub fn emit(&self, event: MediaEvent) {
        self.emit_with(event, None);
    }

    /// Dispatch `event`, then force the ready state if `ready_state` is set.
    pub fn emit_with(&self, event: MediaEvent, ready_state: Option<MediaReadyState>) {
        {
            let mut state = self.state();
            *state = state.after(&event);
            if let Some(ready_state) = ready_state {
                state.ready_state = ready_state;
            }
        }
        trace!(media = %self.label, ?event, "Media event");
        // No listeners is fine.
        let _ = self.events.send(event);
    }

    /// Apply every step due at or before `elapsed` without waiting.
    pub fn apply_due(&self, steps: &[MediaStep], elapsed: u64) {
        for step in steps.iter().filter(|step| step.at_ms <= elapsed) {
            self.emit_with(step.event.clone(), step.ready_state);
        }
    }

    /// Play `steps` against the clock, relative to `epoch`.
    pub async fn play(self: Arc<Self>, mut steps: Vec<MediaStep>, epoch: Instant) {
        steps.sort_by_key(|step| step.at_ms);
        for step in steps {
            sleep_until(epoch + Duration::from_millis(step.at_ms)).await;
            self.emit_with(step.event, step.ready_state);
        }
    }

    pub fn begin_load_calls(&self) -> usize {
        self.begin_load_calls.load(Ordering::SeqCst)
    }

    /// Attached listeners.
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn state(&self) -> MutexGuard<'_, MediaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MediaElement for SimMedia {
    fn source(&self) -> Option<String> {
        self.source.clone()
    }

    fn load_progress(&self) -> LoadProgress {
        self.state().progress
    }

    fn ready_state(&self) -> MediaReadyState {
        self.state().ready_state
    }

    fn begin_load(&self) {
        self.begin_load_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if state.progress == LoadProgress::Idle {
            state.progress = LoadProgress::Loading;
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

/// A stylesheet that is either readable or cross-origin.
#[derive(Debug)]
pub struct SimStyleSheet {
    href: Option<String>,
    accessible: bool,
    rules: usize,
}

impl SimStyleSheet {
    pub fn new(href: Option<String>, accessible: bool, rules: usize) -> Arc<Self> {
        Arc::new(Self {
            href,
            accessible,
            rules,
        })
    }
}

impl StyleSheet for SimStyleSheet {
    fn href(&self) -> Option<String> {
        self.href.clone()
    }

    fn rule_count(&self) -> Result<usize, StyleSheetAccessError> {
        if self.accessible {
            Ok(self.rules)
        } else {
            Err(StyleSheetAccessError {
                reason: "cross-origin stylesheet".to_string(),
            })
        }
    }
}

/// `document.fonts`, ready once marked.
#[derive(Debug)]
pub struct SimFontSet {
    ready: watch::Sender<bool>,
}

impl SimFontSet {
    pub fn new(ready: bool) -> Arc<Self> {
        let (ready, _) = watch::channel(ready);
        Arc::new(Self { ready })
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }
}

#[async_trait]
impl FontSet for SimFontSet {
    async fn ready(&self) {
        let mut ready = self.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = ready.wait_for(|ready| *ready).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_events_imply_state() {
        let video = SimMedia::new("clip.mp4", None, LoadProgress::Idle, MediaReadyState::HaveNothing);

        video.emit(MediaEvent::LoadedMetadata);
        assert_eq!(video.load_progress(), LoadProgress::Loading);
        assert_eq!(video.ready_state(), MediaReadyState::HaveMetadata);

        video.emit(MediaEvent::CanPlay);
        assert_eq!(video.ready_state(), MediaReadyState::HaveFutureData);

        // Ready state never drops on a later, lesser event.
        video.emit(MediaEvent::LoadedData);
        assert_eq!(video.ready_state(), MediaReadyState::HaveFutureData);

        video.emit(MediaEvent::Error {
            message: "network".into(),
        });
        assert_eq!(video.load_progress(), LoadProgress::Errored);
    }

    #[test]
    fn test_forced_ready_state() {
        let video = SimMedia::new("clip.mp4", None, LoadProgress::Loading, MediaReadyState::HaveNothing);
        video.emit_with(MediaEvent::Progress, Some(MediaReadyState::HaveFutureData));
        assert_eq!(video.ready_state(), MediaReadyState::HaveFutureData);
    }

    #[test]
    fn test_begin_load_starts_idle_element() {
        let image = SimMedia::new("a.png", None, LoadProgress::Idle, MediaReadyState::HaveNothing);
        image.begin_load();
        image.begin_load();
        assert_eq!(image.begin_load_calls(), 2);
        assert_eq!(image.load_progress(), LoadProgress::Loading);
    }

    #[test]
    fn test_font_set_waits_until_marked() {
        let fonts = SimFontSet::new(false);
        let mut ready = task::spawn(async { fonts.ready().await });
        assert_pending!(ready.poll());

        fonts.mark_ready();
        assert!(ready.is_woken());
        assert_ready!(ready.poll());
        assert!(fonts.is_ready());
    }
}
