//! The page document as seen by the preloader.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::element::{LoadingMessage, PageElement};
use super::media::{FontSet, MediaElement, StyleSheet};

/// `document.readyState`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentReadyState {
    #[default]
    Loading,
    Interactive,
    /// The window `load` event has fired.
    Complete,
}

/// Everything the preloader reads from, or writes to, the page.
///
/// Optional elements return `None` (or an empty list) when absent; the
/// preloader degrades the matching effect instead of failing.
pub trait PageDocument: Send + Sync + fmt::Debug {
    /// `#preloader`.
    fn preloader(&self) -> Option<Arc<dyn PageElement>>;

    /// `#progressBar`.
    fn progress_bar(&self) -> Option<Arc<dyn PageElement>>;

    /// `#loadingMessage` with its staged lines.
    fn loading_message(&self) -> Option<LoadingMessage>;

    /// `.loader__bar` elements, in climbing order.
    fn loader_bars(&self) -> Vec<Arc<dyn PageElement>>;

    /// `.hero-content > *`, in document order.
    fn hero_content(&self) -> Vec<Arc<dyn PageElement>>;

    /// `.hero-video-background`, the priority resource.
    fn hero_video(&self) -> Option<Arc<dyn MediaElement>>;

    fn images(&self) -> Vec<Arc<dyn MediaElement>>;

    fn videos(&self) -> Vec<Arc<dyn MediaElement>>;

    fn stylesheets(&self) -> Vec<Arc<dyn StyleSheet>>;

    /// `None` when the font loading API is unavailable.
    fn fonts(&self) -> Option<Arc<dyn FontSet>>;

    /// Insert `<link rel="preload" href=url>` into the head and return it.
    fn preload(&self, url: &str) -> Arc<dyn MediaElement>;

    fn is_global_defined(&self, name: &str) -> bool;

    /// Watch `document.readyState`.
    fn ready_state(&self) -> watch::Receiver<DocumentReadyState>;
}
