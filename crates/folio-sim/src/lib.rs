//! Simulated page document for the folio preloader.
//!
//! Implements the `folio_core::ports` traits in memory. A [`PageScenario`]
//! describes the page and when each resource fires its events; a
//! [`SimDocument`] plays that timeline on the tokio clock, so a paused test
//! clock replays a 30 second stall instantly.
//!
//! Elements record every class and style write for later inspection.

mod builtins;
mod document;
mod element;
mod media;
mod scenario;

pub use builtins::{BUILTINS, BuiltinScenario, builtin};
pub use document::SimDocument;
pub use element::SimElement;
pub use media::{SimFontSet, SimMedia, SimStyleSheet};
pub use scenario::{
    FontScript, Layout, MediaScript, MediaStep, MessageLayout, PageScenario, ScenarioError,
    ScriptGlobalScript, StyleSheetScript,
};
