//! Scenario format for the simulated document.
//!
//! A scenario is a JSON document describing what the page contains and when
//! each resource fires its events. All times are milliseconds from document
//! creation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use folio_core::ports::MediaEvent;
use folio_core::{LoadProgress, MediaReadyState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown built-in scenario '{0}'")]
    UnknownBuiltin(String),
}

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStep {
    pub at_ms: u64,
    pub event: MediaEvent,
    /// Ready state to force after the event, when the implied one is wrong.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_state: Option<MediaReadyState>,
}

/// A loadable element and its event timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaScript {
    pub label: String,
    pub src: Option<String>,
    /// State before the first step.
    pub progress: LoadProgress,
    pub ready_state: MediaReadyState,
    pub timeline: Vec<MediaStep>,
}

impl MediaScript {
    /// An idle element whose source is `label`.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            src: Some(label.clone()),
            label,
            ..Self::default()
        }
    }

    /// Already loaded when the page starts.
    pub fn loaded(label: impl Into<String>) -> Self {
        Self::new(label).starting(LoadProgress::Loaded, MediaReadyState::HaveEnoughData)
    }

    #[must_use]
    pub fn starting(mut self, progress: LoadProgress, ready_state: MediaReadyState) -> Self {
        self.progress = progress;
        self.ready_state = ready_state;
        self
    }

    #[must_use]
    pub fn at(mut self, at_ms: u64, event: MediaEvent) -> Self {
        self.timeline.push(MediaStep {
            at_ms,
            event,
            ready_state: None,
        });
        self
    }

    #[must_use]
    pub fn at_with_state(
        mut self,
        at_ms: u64,
        event: MediaEvent,
        ready_state: MediaReadyState,
    ) -> Self {
        self.timeline.push(MediaStep {
            at_ms,
            event,
            ready_state: Some(ready_state),
        });
        self
    }

    /// `load` at `at_ms`.
    #[must_use]
    pub fn loads_at(self, at_ms: u64) -> Self {
        self.at(at_ms, MediaEvent::Load)
    }

    /// `error` at `at_ms`.
    #[must_use]
    pub fn fails_at(self, at_ms: u64) -> Self {
        self.at(
            at_ms,
            MediaEvent::Error {
                message: "net::ERR_FAILED".to_string(),
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSheetScript {
    pub href: Option<String>,
    /// `false` for a cross-origin sheet whose rules cannot be read.
    pub accessible: bool,
    pub rules: usize,
}

impl Default for StyleSheetScript {
    fn default() -> Self {
        Self {
            href: None,
            accessible: true,
            rules: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontScript {
    pub ready_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptGlobalScript {
    pub name: String,
    pub defined_at_ms: u64,
}

/// `data-delay` values (seconds) of the loading message lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageLayout {
    pub part_one: Vec<String>,
    pub part_two: Vec<String>,
}

impl Default for MessageLayout {
    fn default() -> Self {
        Self {
            part_one: vec!["0".to_string(), "0.5".to_string()],
            part_two: vec!["0".to_string(), "0.3".to_string()],
        }
    }
}

/// Which preloader elements the page has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub preloader: bool,
    pub progress_bar: bool,
    pub loading_message: Option<MessageLayout>,
    pub loader_bars: usize,
    pub hero_content: usize,
}

impl Layout {
    /// Every element the preloader knows about.
    pub fn full() -> Self {
        Self {
            preloader: true,
            progress_bar: true,
            loading_message: Some(MessageLayout::default()),
            loader_bars: 5,
            hero_content: 3,
        }
    }

    /// No preloader markup at all.
    pub const fn bare() -> Self {
        Self {
            preloader: false,
            progress_bar: false,
            loading_message: None,
            loader_bars: 0,
            hero_content: 0,
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::full()
    }
}

/// A scripted page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageScenario {
    pub name: String,
    pub description: String,
    /// When the window `load` event fires. `None` means never.
    pub load_at_ms: Option<u64>,
    pub hero_video: Option<MediaScript>,
    pub images: Vec<MediaScript>,
    pub videos: Vec<MediaScript>,
    pub stylesheets: Vec<StyleSheetScript>,
    /// `None` when the font loading API is unavailable.
    pub fonts: Option<FontScript>,
    pub script_globals: Vec<ScriptGlobalScript>,
    /// Timelines for preload links, by URL.
    pub preloads: BTreeMap<String, MediaScript>,
    /// Timeline for preload links not listed in `preloads`. Defaults to
    /// loading instantly.
    pub default_preload: Option<MediaScript>,
    pub layout: Layout,
    /// When the preloader is expected to settle under the default config.
    pub expected_settle_ms: Option<u64>,
}

impl PageScenario {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub const fn loaded_at(mut self, at_ms: u64) -> Self {
        self.load_at_ms = Some(at_ms);
        self
    }

    #[must_use]
    pub fn with_hero(mut self, hero: MediaScript) -> Self {
        self.hero_video = Some(hero);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: MediaScript) -> Self {
        self.images.push(image);
        self
    }

    #[must_use]
    pub fn with_video(mut self, video: MediaScript) -> Self {
        self.videos.push(video);
        self
    }

    #[must_use]
    pub fn with_stylesheet(mut self, href: impl Into<String>, accessible: bool) -> Self {
        self.stylesheets.push(StyleSheetScript {
            href: Some(href.into()),
            accessible,
            rules: if accessible { 24 } else { 0 },
        });
        self
    }

    #[must_use]
    pub const fn with_fonts_ready_at(mut self, at_ms: u64) -> Self {
        self.fonts = Some(FontScript { ready_at_ms: at_ms });
        self
    }

    #[must_use]
    pub fn with_global(mut self, name: impl Into<String>, defined_at_ms: u64) -> Self {
        self.script_globals.push(ScriptGlobalScript {
            name: name.into(),
            defined_at_ms,
        });
        self
    }

    #[must_use]
    pub fn with_preload(mut self, url: impl Into<String>, script: MediaScript) -> Self {
        self.preloads.insert(url.into(), script);
        self
    }

    #[must_use]
    pub fn with_default_preload(mut self, script: MediaScript) -> Self {
        self.default_preload = Some(script);
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub const fn expecting_settle_at(mut self, at_ms: u64) -> Self {
        self.expected_settle_ms = Some(at_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let scenario = PageScenario::from_json_str(r#"{ "name": "empty" }"#).unwrap();
        assert_eq!(scenario.name, "empty");
        assert_eq!(scenario.load_at_ms, None);
        assert!(scenario.hero_video.is_none());
        assert_eq!(scenario.layout, Layout::full());
    }

    #[test]
    fn test_timeline_json() {
        let json = r#"{
            "load_at_ms": 900,
            "hero_video": {
                "label": "hero.mp4",
                "timeline": [
                    { "at_ms": 100, "event": { "type": "loaded_metadata" } },
                    { "at_ms": 700, "event": { "type": "error", "message": "decode" } }
                ]
            },
            "stylesheets": [{ "href": "https://cdn.example/a.css", "accessible": false }],
            "layout": { "preloader": true, "hero_content": 2 }
        }"#;
        let scenario = PageScenario::from_json_str(json).unwrap();

        let hero = scenario.hero_video.unwrap();
        assert_eq!(hero.progress, LoadProgress::Idle);
        assert_eq!(hero.timeline.len(), 2);
        assert_eq!(
            hero.timeline[1].event,
            MediaEvent::Error {
                message: "decode".into()
            }
        );
        assert!(!scenario.stylesheets[0].accessible);
        // Omitted layout fields keep the full layout.
        assert!(scenario.layout.progress_bar);
        assert_eq!(scenario.layout.hero_content, 2);
    }

    #[test]
    fn test_stylesheet_defaults_to_accessible() {
        let scenario =
            PageScenario::from_json_str(r#"{ "stylesheets": [{ "href": "style.css" }] }"#).unwrap();
        assert!(scenario.stylesheets[0].accessible);
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let err = PageScenario::from_json_str(r#"{ "load_at_ms": "soon" }"#).unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }

    #[test]
    fn test_builders() {
        let scenario = PageScenario::named("demo")
            .loaded_at(800)
            .with_image(MediaScript::new("a.png").loads_at(100))
            .with_global("particlesJS", 0)
            .with_fonts_ready_at(300);

        assert_eq!(scenario.images[0].src.as_deref(), Some("a.png"));
        assert_eq!(scenario.images[0].timeline[0].event, MediaEvent::Load);
        assert_eq!(scenario.fonts, Some(FontScript { ready_at_ms: 300 }));
        assert_eq!(scenario.script_globals[0].name, "particlesJS");
    }
}
