//! The simulated page document.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use folio_core::ports::{
    DocumentReadyState, FontSet, LoadingMessage, MediaElement, PageDocument, PageElement,
    RevealLine, StyleSheet,
};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::element::SimElement;
use crate::media::{SimFontSet, SimMedia, SimStyleSheet};
use crate::scenario::{MediaScript, MediaStep, MessageLayout, PageScenario};

#[derive(Debug)]
struct SimMessage {
    container: Arc<SimElement>,
    part_one: Vec<(Arc<SimElement>, String)>,
    part_two: Vec<(Arc<SimElement>, String)>,
}

impl SimMessage {
    fn build(layout: &MessageLayout) -> Self {
        let lines = |prefix: &str, delays: &[String]| -> Vec<(Arc<SimElement>, String)> {
            delays
                .iter()
                .enumerate()
                .map(|(i, delay)| (SimElement::new(format!("{prefix}-{i}")), delay.clone()))
                .collect()
        };
        Self {
            container: SimElement::new("loadingMessage"),
            part_one: lines("text-line", &layout.part_one),
            part_two: lines("blur-text-line", &layout.part_two),
        }
    }

    fn to_port(&self) -> LoadingMessage {
        let lines = |lines: &[(Arc<SimElement>, String)]| -> Vec<RevealLine> {
            lines
                .iter()
                .map(|(element, delay)| {
                    RevealLine::new(element.clone(), Some(delay.clone()))
                })
                .collect()
        };
        LoadingMessage {
            container: self.container.clone(),
            part_one: lines(&self.part_one),
            part_two: lines(&self.part_two),
        }
    }
}

/// A `PageDocument` whose resources follow a [`PageScenario`].
///
/// Scenario times are measured from construction. Timelines are played by
/// tasks on the current tokio runtime; without one (or when built with
/// [`SimDocument::detached`]) only the state at time zero is applied.
#[derive(Debug)]
pub struct SimDocument {
    name: String,
    epoch: Instant,
    spawn: Option<Handle>,
    preloader: Option<Arc<SimElement>>,
    progress_bar: Option<Arc<SimElement>>,
    message: Option<SimMessage>,
    loader_bars: Vec<Arc<SimElement>>,
    hero_content: Vec<Arc<SimElement>>,
    hero_video: Option<Arc<SimMedia>>,
    images: Vec<Arc<SimMedia>>,
    videos: Vec<Arc<SimMedia>>,
    stylesheets: Vec<Arc<SimStyleSheet>>,
    fonts: Option<Arc<SimFontSet>>,
    globals: BTreeMap<String, Duration>,
    preload_scripts: BTreeMap<String, MediaScript>,
    default_preload: MediaScript,
    preloaded: Mutex<Vec<Arc<SimMedia>>>,
    ready_state: watch::Sender<DocumentReadyState>,
}

impl SimDocument {
    /// Build the page and start its timelines.
    pub fn new(scenario: PageScenario) -> Arc<Self> {
        let spawn = Handle::try_current().ok();
        if spawn.is_none() {
            warn!(scenario = %scenario.name, "No tokio runtime, scenario timelines will not play");
        }
        Self::build(scenario, spawn)
    }

    /// Build the page without starting any timeline.
    pub fn detached(scenario: PageScenario) -> Arc<Self> {
        Self::build(scenario, None)
    }

    fn build(scenario: PageScenario, spawn: Option<Handle>) -> Arc<Self> {
        let epoch = Instant::now();
        let layout = &scenario.layout;

        let media = |script: &MediaScript| {
            let media = SimMedia::new(
                script.label.clone(),
                script.src.clone(),
                script.progress,
                script.ready_state,
            );
            media.apply_due(&script.timeline, 0);
            if let Some(handle) = &spawn {
                handle.spawn(Arc::clone(&media).play(pending_steps(script), epoch));
            }
            media
        };

        let fonts = scenario.fonts.map(|script| {
            let fonts = SimFontSet::new(script.ready_at_ms == 0);
            if let (Some(handle), false) = (&spawn, fonts.is_ready()) {
                let fonts = Arc::clone(&fonts);
                handle.spawn(async move {
                    sleep_until(epoch + Duration::from_millis(script.ready_at_ms)).await;
                    fonts.mark_ready();
                });
            }
            fonts
        });

        let initial = if scenario.load_at_ms == Some(0) {
            DocumentReadyState::Complete
        } else {
            DocumentReadyState::Loading
        };
        let (ready_state, _) = watch::channel(initial);

        let document = Arc::new(Self {
            name: scenario.name.clone(),
            epoch,
            preloader: layout.preloader.then(|| SimElement::new("preloader")),
            progress_bar: layout.progress_bar.then(|| SimElement::new("progressBar")),
            message: layout.loading_message.as_ref().map(SimMessage::build),
            loader_bars: (0..layout.loader_bars)
                .map(|i| SimElement::new(format!("loader__bar-{i}")))
                .collect(),
            hero_content: (0..layout.hero_content)
                .map(|i| SimElement::new(format!("hero-content-{i}")))
                .collect(),
            hero_video: scenario.hero_video.as_ref().map(&media),
            images: scenario.images.iter().map(&media).collect(),
            videos: scenario.videos.iter().map(&media).collect(),
            stylesheets: scenario
                .stylesheets
                .iter()
                .map(|sheet| SimStyleSheet::new(sheet.href.clone(), sheet.accessible, sheet.rules))
                .collect(),
            fonts,
            globals: scenario
                .script_globals
                .iter()
                .map(|global| {
                    (
                        global.name.clone(),
                        Duration::from_millis(global.defined_at_ms),
                    )
                })
                .collect(),
            preload_scripts: scenario.preloads,
            default_preload: scenario
                .default_preload
                .unwrap_or_else(|| MediaScript::loaded("preload")),
            preloaded: Mutex::new(Vec::new()),
            ready_state,
            spawn,
        });

        if let (Some(handle), Some(at_ms)) = (&document.spawn, scenario.load_at_ms) {
            if at_ms > 0 {
                handle.spawn(fire_load(Arc::downgrade(&document), epoch, at_ms));
            }
        }
        debug!(scenario = %document.name, "Simulated document built");
        document
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instant the scenario clock started.
    pub const fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Fire the window `load` event now.
    pub fn mark_loaded(&self) {
        self.ready_state.send_if_modified(|state| {
            if *state == DocumentReadyState::Complete {
                return false;
            }
            *state = DocumentReadyState::Complete;
            true
        });
    }

    pub fn preloader_element(&self) -> Option<Arc<SimElement>> {
        self.preloader.clone()
    }

    pub fn progress_bar_element(&self) -> Option<Arc<SimElement>> {
        self.progress_bar.clone()
    }

    pub fn message_container(&self) -> Option<Arc<SimElement>> {
        self.message.as_ref().map(|m| m.container.clone())
    }

    /// Message lines: part one, then part two.
    pub fn message_lines(&self) -> Vec<Arc<SimElement>> {
        self.message
            .iter()
            .flat_map(|m| m.part_one.iter().chain(&m.part_two))
            .map(|(element, _)| element.clone())
            .collect()
    }

    pub fn loader_bar_elements(&self) -> Vec<Arc<SimElement>> {
        self.loader_bars.clone()
    }

    pub fn hero_elements(&self) -> Vec<Arc<SimElement>> {
        self.hero_content.clone()
    }

    pub fn hero_media(&self) -> Option<Arc<SimMedia>> {
        self.hero_video.clone()
    }

    pub fn image_media(&self) -> Vec<Arc<SimMedia>> {
        self.images.clone()
    }

    /// Preload links inserted so far.
    pub fn preloaded(&self) -> Vec<Arc<SimMedia>> {
        self.preloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Steps still ahead of time zero.
fn pending_steps(script: &MediaScript) -> Vec<MediaStep> {
    script
        .timeline
        .iter()
        .filter(|step| step.at_ms > 0)
        .cloned()
        .collect()
}

async fn fire_load(document: Weak<SimDocument>, epoch: Instant, at_ms: u64) {
    sleep_until(epoch + Duration::from_millis(at_ms)).await;
    if let Some(document) = document.upgrade() {
        debug!(scenario = %document.name, at_ms, "Window load event");
        document.mark_loaded();
    }
}

fn element(element: Option<&Arc<SimElement>>) -> Option<Arc<dyn PageElement>> {
    element.map(|e| Arc::clone(e) as Arc<dyn PageElement>)
}

fn elements(elements: &[Arc<SimElement>]) -> Vec<Arc<dyn PageElement>> {
    elements
        .iter()
        .map(|e| Arc::clone(e) as Arc<dyn PageElement>)
        .collect()
}

fn media(media: &[Arc<SimMedia>]) -> Vec<Arc<dyn MediaElement>> {
    media
        .iter()
        .map(|m| Arc::clone(m) as Arc<dyn MediaElement>)
        .collect()
}

impl PageDocument for SimDocument {
    fn preloader(&self) -> Option<Arc<dyn PageElement>> {
        element(self.preloader.as_ref())
    }

    fn progress_bar(&self) -> Option<Arc<dyn PageElement>> {
        element(self.progress_bar.as_ref())
    }

    fn loading_message(&self) -> Option<LoadingMessage> {
        self.message.as_ref().map(SimMessage::to_port)
    }

    fn loader_bars(&self) -> Vec<Arc<dyn PageElement>> {
        elements(&self.loader_bars)
    }

    fn hero_content(&self) -> Vec<Arc<dyn PageElement>> {
        elements(&self.hero_content)
    }

    fn hero_video(&self) -> Option<Arc<dyn MediaElement>> {
        self.hero_video
            .as_ref()
            .map(|m| Arc::clone(m) as Arc<dyn MediaElement>)
    }

    fn images(&self) -> Vec<Arc<dyn MediaElement>> {
        media(&self.images)
    }

    fn videos(&self) -> Vec<Arc<dyn MediaElement>> {
        media(&self.videos)
    }

    fn stylesheets(&self) -> Vec<Arc<dyn StyleSheet>> {
        self.stylesheets
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn StyleSheet>)
            .collect()
    }

    fn fonts(&self) -> Option<Arc<dyn FontSet>> {
        self.fonts
            .as_ref()
            .map(|f| Arc::clone(f) as Arc<dyn FontSet>)
    }

    fn preload(&self, url: &str) -> Arc<dyn MediaElement> {
        let script = self
            .preload_scripts
            .get(url)
            .unwrap_or(&self.default_preload);
        let link = SimMedia::new(url, Some(url.to_string()), script.progress, script.ready_state);

        let elapsed = self.elapsed_ms();
        link.apply_due(&script.timeline, elapsed);
        if let Some(handle) = &self.spawn {
            let ahead = script
                .timeline
                .iter()
                .filter(|step| step.at_ms > elapsed)
                .cloned()
                .collect();
            handle.spawn(Arc::clone(&link).play(ahead, self.epoch));
        }

        self.preloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&link));
        link
    }

    fn is_global_defined(&self, name: &str) -> bool {
        self.globals
            .get(name)
            .is_some_and(|at| self.epoch.elapsed() >= *at)
    }

    fn ready_state(&self) -> watch::Receiver<DocumentReadyState> {
        self.ready_state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::ports::MediaEvent;
    use folio_core::{LoadProgress, MediaReadyState};
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_load_event_fires_on_schedule() {
        let document = SimDocument::new(PageScenario::default().loaded_at(800));
        let mut ready = document.ready_state();
        assert_eq!(*ready.borrow(), DocumentReadyState::Loading);

        let start = Instant::now();
        ready
            .wait_for(|state| *state == DocumentReadyState::Complete)
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(800));
    }

    #[test]
    fn test_detached_applies_time_zero_only() {
        let hero = MediaScript::new("hero.mp4")
            .at(0, MediaEvent::LoadedMetadata)
            .at(500, MediaEvent::CanPlayThrough);
        let document = SimDocument::detached(PageScenario::default().with_hero(hero).loaded_at(0));

        let hero = document.hero_media().unwrap();
        assert_eq!(hero.ready_state(), MediaReadyState::HaveMetadata);
        assert_eq!(*document.ready_state().borrow(), DocumentReadyState::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timelines_play() {
        let scenario = PageScenario::default()
            .with_image(MediaScript::new("a.png").loads_at(300))
            .with_fonts_ready_at(200)
            .with_global("particlesJS", 100);
        let document = SimDocument::new(scenario);
        let image = document.image_media().remove(0);

        assert!(!document.is_global_defined("particlesJS"));
        sleep(Duration::from_millis(150)).await;
        assert!(document.is_global_defined("particlesJS"));
        assert!(!document.is_global_defined("jQuery"));

        document.fonts().unwrap().ready().await;
        assert_eq!(document.epoch().elapsed(), Duration::from_millis(200));

        sleep(Duration::from_millis(150)).await;
        assert_eq!(image.load_progress(), LoadProgress::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_links_follow_their_script() {
        let url = "https://cdn.example/lib.js";
        let scenario = PageScenario::default()
            .with_preload(url, MediaScript::new(url).fails_at(400));
        let document = SimDocument::new(scenario);

        let link = document.preload(url);
        let other = document.preload("https://cdn.example/style.css");
        assert_eq!(link.load_progress(), LoadProgress::Idle);
        assert_eq!(other.load_progress(), LoadProgress::Loaded);

        sleep(Duration::from_millis(401)).await;
        assert_eq!(link.load_progress(), LoadProgress::Errored);
        assert_eq!(document.preloaded().len(), 2);
    }

    #[test]
    fn test_layout_controls_elements() {
        let document = SimDocument::detached(
            PageScenario::default().with_layout(crate::scenario::Layout::bare()),
        );
        assert!(document.preloader().is_none());
        assert!(document.loading_message().is_none());
        assert!(document.loader_bars().is_empty());

        let document = SimDocument::detached(PageScenario::default());
        let message = document.loading_message().unwrap();
        assert_eq!(message.part_one.len(), 2);
        assert_eq!(message.part_two[1].delay(), Duration::from_millis(300));
        assert_eq!(document.loader_bars().len(), 5);
        assert_eq!(document.message_lines().len(), 4);
    }
}
