//! Built-in scenarios.
//!
//! Each one pins a settle time under the default preloader configuration.

use folio_core::ports::MediaEvent;
use folio_core::MediaReadyState;

use crate::scenario::{MediaScript, PageScenario, ScenarioError};

/// Catalogue entry for a built-in scenario.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinScenario {
    pub name: &'static str,
    pub summary: &'static str,
    build: fn() -> PageScenario,
}

impl BuiltinScenario {
    pub fn scenario(&self) -> PageScenario {
        let scenario = (self.build)();
        PageScenario {
            name: self.name.to_string(),
            description: self.summary.to_string(),
            ..scenario
        }
    }
}

pub const BUILTINS: [BuiltinScenario; 5] = [
    BuiltinScenario {
        name: "priority-ready-before-load",
        summary: "Hero video can play through at 2000 ms, window load at 2500 ms",
        build: priority_ready_before_load,
    },
    BuiltinScenario {
        name: "priority-never-ready",
        summary: "Hero video stalls after metadata, window load at 1000 ms",
        build: priority_never_ready,
    },
    BuiltinScenario {
        name: "priority-hero-error",
        summary: "Hero video fails to decode at 400 ms, window load at 1200 ms",
        build: priority_hero_error,
    },
    BuiltinScenario {
        name: "aggregate-fast",
        summary: "No hero video, three images loaded by 500 ms, window load at 800 ms",
        build: aggregate_fast,
    },
    BuiltinScenario {
        name: "stalled-network",
        summary: "No hero video, every resource fails and window load never fires",
        build: stalled_network,
    },
];

/// Look a built-in scenario up by name.
pub fn builtin(name: &str) -> Result<PageScenario, ScenarioError> {
    BUILTINS
        .iter()
        .find(|builtin| builtin.name == name)
        .map(BuiltinScenario::scenario)
        .ok_or_else(|| ScenarioError::UnknownBuiltin(name.to_string()))
}

fn hero() -> MediaScript {
    MediaScript::new("videos/hero-loop.mp4")
}

fn priority_ready_before_load() -> PageScenario {
    PageScenario::default()
        .with_hero(
            hero()
                .at(600, MediaEvent::LoadedMetadata)
                .at(1200, MediaEvent::LoadedData)
                .at(2000, MediaEvent::CanPlayThrough),
        )
        .with_image(MediaScript::new("images/portrait.webp").loads_at(900))
        .loaded_at(2500)
        .expecting_settle_at(2500)
}

fn priority_never_ready() -> PageScenario {
    PageScenario::default()
        .with_hero(
            hero()
                .at(300, MediaEvent::LoadedMetadata)
                .at(700, MediaEvent::Progress),
        )
        .loaded_at(1000)
        .expecting_settle_at(15_000)
}

fn priority_hero_error() -> PageScenario {
    PageScenario::default()
        .with_hero(hero().at(
            400,
            MediaEvent::Error {
                message: "MEDIA_ERR_DECODE".to_string(),
            },
        ))
        .loaded_at(1200)
        .expecting_settle_at(1200)
}

fn aggregate_fast() -> PageScenario {
    PageScenario::default()
        .with_image(MediaScript::new("images/portrait.webp").loads_at(100))
        .with_image(MediaScript::new("images/project-1.webp").loads_at(300))
        .with_image(MediaScript::new("images/project-2.webp").loads_at(500))
        .with_stylesheet("css/style.css", true)
        .with_fonts_ready_at(300)
        .with_global("particlesJS", 0)
        .loaded_at(800)
        .expecting_settle_at(2500)
}

fn stalled_network() -> PageScenario {
    PageScenario::default()
        .with_image(MediaScript::new("images/portrait.webp").fails_at(4000))
        .with_video(
            MediaScript::new("videos/showreel.mp4")
                .at_with_state(
                    2000,
                    MediaEvent::Progress,
                    MediaReadyState::HaveMetadata,
                )
                .fails_at(9000),
        )
        .with_stylesheet("https://cdn.example.com/theme.css", false)
        .with_default_preload(MediaScript::new("preload").fails_at(6000))
        .expecting_settle_at(30_000)
}
