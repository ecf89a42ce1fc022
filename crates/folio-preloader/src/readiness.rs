//! Readiness signals.
//!
//! A readiness signal wraps one resource and resolves to `Ready` or `Failed`.
//! It never errors: a failed resource is an outcome like any other, so one
//! broken asset cannot stall a wait on many.
//!
//! Listeners are attached before the element's state is sampled. A resource
//! that is already terminal resolves on the first poll.

use std::future::{Future, pending};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use folio_core::ports::{
    DocumentReadyState, FontSet, MediaElement, MediaEvent, PageDocument, StyleSheet,
};
use folio_core::{
    LoadProgress, MediaReadyState, PreloaderConfig, ReadinessState, ResourceHandle, ResourceId,
    ResourceKind, ResourceTarget, Settled,
};
use futures_util::future::BoxFuture;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Readiness rules for the three flavours of loadable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// Images and preload links: `load` or `error`.
    Element,
    /// Videos on the aggregate path: any data event counts.
    Video,
    /// The hero video: needs enough future data to play smoothly.
    Hero,
}

impl Rule {
    fn on_snapshot(self, element: &dyn MediaElement) -> Option<ReadinessState> {
        if element.load_progress() == LoadProgress::Errored {
            return Some(ReadinessState::Failed);
        }
        let ready = match self {
            Self::Element => element.load_progress() == LoadProgress::Loaded,
            Self::Video | Self::Hero => element.ready_state() >= MediaReadyState::HaveFutureData,
        };
        ready.then_some(ReadinessState::Ready)
    }

    fn on_event(self, event: &MediaEvent, ready_state: MediaReadyState) -> Option<ReadinessState> {
        let has_future_data = ready_state >= MediaReadyState::HaveFutureData;
        match (self, event) {
            (_, MediaEvent::Error { .. }) => Some(ReadinessState::Failed),
            (Self::Element, MediaEvent::Load)
            | (
                Self::Video,
                MediaEvent::CanPlay
                | MediaEvent::CanPlayThrough
                | MediaEvent::LoadedData
                | MediaEvent::LoadedMetadata,
            )
            | (Self::Hero, MediaEvent::CanPlay | MediaEvent::CanPlayThrough) => {
                Some(ReadinessState::Ready)
            }
            (Self::Video | Self::Hero, MediaEvent::Progress)
            | (Self::Hero, MediaEvent::LoadedData | MediaEvent::LoadedMetadata)
                if has_future_data =>
            {
                Some(ReadinessState::Ready)
            }
            _ => None,
        }
    }
}

/// Wait on `events` until `rule` reaches a verdict.
async fn await_events(
    element: &dyn MediaElement,
    mut events: broadcast::Receiver<MediaEvent>,
    rule: Rule,
) -> ReadinessState {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(state) = rule.on_event(&event, element.ready_state()) {
                    return state;
                }
            }
            Err(RecvError::Lagged(missed)) => {
                debug!(missed, "Listener lagged, re-reading element state");
                if let Some(state) = rule.on_snapshot(element) {
                    return state;
                }
            }
            // The element went away; nothing will ever fire.
            Err(RecvError::Closed) => return ReadinessState::Failed,
        }
    }
}

/// Image or preload link: resolves on `load` / `error`.
///
/// An element that has not started loading is kicked off.
pub async fn element_loaded(element: Arc<dyn MediaElement>) -> ReadinessState {
    let events = element.subscribe();
    if let Some(state) = Rule::Element.on_snapshot(element.as_ref()) {
        return state;
    }
    if element.load_progress() == LoadProgress::Idle {
        element.begin_load();
    }
    await_events(element.as_ref(), events, Rule::Element).await
}

/// Video on the aggregate path.
///
/// Already fully buffered resolves at once; "future data" resolves after
/// `settle_delay`. Otherwise any data event resolves it, and a probe after
/// `probe_after` accepts a video that has at least its current frame.
pub async fn video_ready(
    video: Arc<dyn MediaElement>,
    settle_delay: Duration,
    probe_after: Duration,
) -> ReadinessState {
    let events = video.subscribe();
    let ready_state = video.ready_state();

    if ready_state >= MediaReadyState::HaveEnoughData {
        return ReadinessState::Ready;
    }
    if ready_state >= MediaReadyState::HaveFutureData {
        drop(events);
        sleep(settle_delay).await;
        return ReadinessState::Ready;
    }
    if video.load_progress() == LoadProgress::Errored {
        return ReadinessState::Failed;
    }
    if ready_state == MediaReadyState::HaveNothing {
        video.begin_load();
    }

    let probe = async {
        sleep(probe_after).await;
        if video.ready_state() >= MediaReadyState::HaveCurrentData {
            ReadinessState::Ready
        } else {
            pending().await
        }
    };

    tokio::select! {
        biased;
        state = await_events(video.as_ref(), events, Rule::Video) => state,
        state = probe => state,
    }
}

/// The hero video: ready once it can play without stalling.
pub async fn hero_ready(video: Arc<dyn MediaElement>) -> ReadinessState {
    let events = video.subscribe();
    if let Some(state) = Rule::Hero.on_snapshot(video.as_ref()) {
        return state;
    }
    if video.ready_state() == MediaReadyState::HaveNothing
        && video.load_progress() == LoadProgress::Idle
    {
        video.begin_load();
    }
    await_events(video.as_ref(), events, Rule::Hero).await
}

/// A stylesheet is ready when its rules can be read.
pub fn stylesheet_ready(sheet: &dyn StyleSheet) -> ReadinessState {
    match sheet.rule_count() {
        Ok(rules) => {
            debug!(href = ?sheet.href(), rules, "Stylesheet loaded");
            ReadinessState::Ready
        }
        Err(e) => {
            debug!(href = ?sheet.href(), error = %e, "Stylesheet unreadable, continuing");
            ReadinessState::Failed
        }
    }
}

pub async fn fonts_ready(fonts: Arc<dyn FontSet>) -> ReadinessState {
    fonts.ready().await;
    ReadinessState::Ready
}

/// A third-party script is ready once it defines its global.
///
/// Checked now and once more after `grace`.
pub async fn script_global_ready(
    document: Arc<dyn PageDocument>,
    name: String,
    grace: Duration,
) -> ReadinessState {
    if document.is_global_defined(&name) {
        return ReadinessState::Ready;
    }
    debug!(global = %name, "Waiting for script global");
    sleep(grace).await;
    if document.is_global_defined(&name) {
        ReadinessState::Ready
    } else {
        ReadinessState::Failed
    }
}

/// Resolves once the document reports `complete` (the window `load` event).
///
/// A document that can no longer report load never resolves.
pub async fn page_loaded(document: Arc<dyn PageDocument>) {
    let mut ready_state = document.ready_state();
    let loaded = ready_state
        .wait_for(|state| *state == DocumentReadyState::Complete)
        .await
        .is_ok();
    if loaded {
        debug!("Window load event fired");
    } else {
        warn!("Document ready state source closed before load");
        pending::<()>().await;
    }
}

/// Future resolving to the [`Settled`] outcome of one resource.
///
/// Consumes its [`ResourceHandle`].
#[must_use = "signals do nothing unless awaited"]
pub struct ReadinessSignal {
    id: ResourceId,
    kind: ResourceKind,
    label: String,
    inner: BoxFuture<'static, ReadinessState>,
}

impl ReadinessSignal {
    /// Build the signal matching the handle's kind.
    pub fn watch(
        handle: ResourceHandle,
        document: &Arc<dyn PageDocument>,
        config: &PreloaderConfig,
    ) -> Self {
        let inner: BoxFuture<'static, ReadinessState> = match handle.target().clone() {
            ResourceTarget::Element(video) if handle.kind() == ResourceKind::Video => Box::pin(
                video_ready(video, config.video_settle_delay, config.video_probe_after),
            ),
            ResourceTarget::Element(element) => Box::pin(element_loaded(element)),
            ResourceTarget::Fonts(fonts) => Box::pin(fonts_ready(fonts)),
            ResourceTarget::Stylesheet(sheet) => {
                Box::pin(async move { stylesheet_ready(sheet.as_ref()) })
            }
            ResourceTarget::ScriptGlobal(name) => Box::pin(script_global_ready(
                Arc::clone(document),
                name,
                config.script_grace,
            )),
        };
        Self::new(&handle, inner)
    }

    /// Wrap an arbitrary readiness future for `handle`.
    pub fn new(handle: &ResourceHandle, inner: BoxFuture<'static, ReadinessState>) -> Self {
        Self {
            id: handle.id(),
            kind: handle.kind(),
            label: handle.label().to_string(),
            inner,
        }
    }

    pub const fn id(&self) -> ResourceId {
        self.id
    }
}

impl Future for ReadinessSignal {
    type Output = Settled;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.inner.as_mut().poll(cx).map(|state| {
            debug!(resource = %this.label, kind = %this.kind, %state, "Resource settled");
            Settled {
                id: this.id,
                kind: this.kind,
                label: this.label.clone(),
                state,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_sim::{SimMedia, SimStyleSheet};
    use tokio_test::{assert_pending, assert_ready, assert_ready_eq, task};

    fn media(progress: LoadProgress, ready_state: MediaReadyState) -> Arc<SimMedia> {
        SimMedia::new("test.png", Some("https://example.com/test.png".into()), progress, ready_state)
    }

    #[test]
    fn test_event_rules() {
        let none = MediaReadyState::HaveNothing;
        let future = MediaReadyState::HaveFutureData;

        assert_eq!(Rule::Element.on_event(&MediaEvent::Load, none), Some(ReadinessState::Ready));
        assert_eq!(Rule::Element.on_event(&MediaEvent::CanPlay, none), None);
        assert_eq!(
            Rule::Video.on_event(&MediaEvent::LoadedMetadata, none),
            Some(ReadinessState::Ready)
        );
        assert_eq!(Rule::Hero.on_event(&MediaEvent::LoadedMetadata, none), None);
        assert_eq!(
            Rule::Hero.on_event(&MediaEvent::LoadedData, future),
            Some(ReadinessState::Ready)
        );
        assert_eq!(Rule::Video.on_event(&MediaEvent::Progress, none), None);
        assert_eq!(
            Rule::Video.on_event(&MediaEvent::Progress, future),
            Some(ReadinessState::Ready)
        );
        assert_eq!(
            Rule::Hero.on_event(&MediaEvent::Error { message: "404".into() }, none),
            Some(ReadinessState::Failed)
        );
    }

    #[test]
    fn test_cached_image_resolves_on_first_poll() {
        let image = media(LoadProgress::Loaded, MediaReadyState::HaveEnoughData);
        let mut signal = task::spawn(element_loaded(image.clone()));
        assert_ready_eq!(signal.poll(), ReadinessState::Ready);
        assert_eq!(image.begin_load_calls(), 0);
    }

    #[test]
    fn test_broken_image_resolves_failed_without_waiting() {
        let image = media(LoadProgress::Errored, MediaReadyState::HaveNothing);
        let mut signal = task::spawn(element_loaded(image));
        assert_ready_eq!(signal.poll(), ReadinessState::Failed);
    }

    #[test]
    fn test_idle_image_is_kicked_and_waits_for_load() {
        let image = media(LoadProgress::Idle, MediaReadyState::HaveNothing);
        let mut signal = task::spawn(element_loaded(image.clone()));

        assert_pending!(signal.poll());
        assert_eq!(image.begin_load_calls(), 1);
        assert_eq!(image.listener_count(), 1);

        image.emit(MediaEvent::Load);
        assert!(signal.is_woken());
        assert_ready_eq!(signal.poll(), ReadinessState::Ready);
        drop(signal);
        assert_eq!(image.listener_count(), 0);
    }

    #[test]
    fn test_image_error_resolves_failed() {
        let image = media(LoadProgress::Loading, MediaReadyState::HaveNothing);
        let mut signal = task::spawn(element_loaded(image.clone()));
        assert_pending!(signal.poll());
        assert_eq!(image.begin_load_calls(), 0);

        image.emit(MediaEvent::Error {
            message: "404".into(),
        });
        assert_ready_eq!(signal.poll(), ReadinessState::Failed);
    }

    #[test]
    fn test_hero_ignores_metadata_until_future_data() {
        let hero = media(LoadProgress::Idle, MediaReadyState::HaveNothing);
        let mut signal = task::spawn(hero_ready(hero.clone()));
        assert_pending!(signal.poll());
        assert_eq!(hero.begin_load_calls(), 1);

        hero.emit(MediaEvent::LoadedMetadata);
        assert_pending!(signal.poll());

        hero.emit(MediaEvent::CanPlay);
        assert_ready_eq!(signal.poll(), ReadinessState::Ready);
    }

    #[test]
    fn test_hero_with_future_data_is_ready_now() {
        let hero = media(LoadProgress::Loading, MediaReadyState::HaveFutureData);
        let mut signal = task::spawn(hero_ready(hero));
        assert_ready_eq!(signal.poll(), ReadinessState::Ready);
    }

    #[test]
    fn test_dropped_element_counts_as_failed() {
        let image = media(LoadProgress::Loading, MediaReadyState::HaveNothing);
        let events = image.subscribe();
        drop(image);

        let observer = media(LoadProgress::Loading, MediaReadyState::HaveNothing);
        let mut wait = task::spawn(await_events(observer.as_ref(), events, Rule::Element));
        assert_ready_eq!(wait.poll(), ReadinessState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_with_future_data_waits_settle_delay() {
        let video = media(LoadProgress::Loading, MediaReadyState::HaveFutureData);
        let start = tokio::time::Instant::now();
        let state = video_ready(
            video,
            Duration::from_millis(500),
            Duration::from_millis(5000),
        )
        .await;
        assert_eq!(state, ReadinessState::Ready);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_probe_accepts_current_data() {
        let video = media(LoadProgress::Loading, MediaReadyState::HaveCurrentData);
        let start = tokio::time::Instant::now();
        let state = video_ready(
            video.clone(),
            Duration::from_millis(500),
            Duration::from_millis(5000),
        )
        .await;
        assert_eq!(state, ReadinessState::Ready);
        assert_eq!(start.elapsed(), Duration::from_millis(5000));
        assert_eq!(video.begin_load_calls(), 0);
    }

    #[test]
    fn test_stylesheet_readiness() {
        let readable = SimStyleSheet::new(Some("style.css".into()), true, 42);
        let cross_origin = SimStyleSheet::new(Some("https://cdn.example/x.css".into()), false, 0);
        assert_eq!(stylesheet_ready(readable.as_ref()), ReadinessState::Ready);
        assert_eq!(stylesheet_ready(cross_origin.as_ref()), ReadinessState::Failed);
    }

    #[test]
    fn test_signal_reports_handle_identity() {
        let image = media(LoadProgress::Loaded, MediaReadyState::HaveEnoughData);
        let handle = ResourceHandle::new(
            ResourceId(7),
            ResourceKind::Image,
            "test.png",
            ResourceTarget::Element(image),
        );
        let document: Arc<dyn PageDocument> =
            folio_sim::SimDocument::detached(folio_sim::PageScenario::default());
        let signal = ReadinessSignal::watch(handle, &document, &PreloaderConfig::default());
        assert_eq!(signal.id(), ResourceId(7));

        let mut signal = task::spawn(signal);
        let settled = assert_ready!(signal.poll());
        assert_eq!(settled.id, ResourceId(7));
        assert_eq!(settled.kind, ResourceKind::Image);
        assert_eq!(settled.label, "test.png");
        assert_eq!(settled.state, ReadinessState::Ready);
    }
}
