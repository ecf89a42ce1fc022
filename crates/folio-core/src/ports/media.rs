//! Loadable resources: media elements, stylesheets and the font set.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::resource::{LoadProgress, MediaReadyState};

/// Events a loadable element dispatches.
///
/// Names mirror the DOM events they stand for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaEvent {
    Load,
    Error { message: String },
    LoadedMetadata,
    LoadedData,
    CanPlay,
    CanPlayThrough,
    Progress,
}

/// An `<img>`, `<video>` or preload `<link>` element.
///
/// Subscribing returns a receiver; dropping it detaches the listener.
pub trait MediaElement: Send + Sync + fmt::Debug {
    /// The resource URL, when the element has one.
    fn source(&self) -> Option<String>;

    /// Current network state.
    fn load_progress(&self) -> LoadProgress;

    /// Current media ready state. Non-media elements report
    /// `HaveEnoughData` once loaded and `HaveNothing` otherwise.
    fn ready_state(&self) -> MediaReadyState;

    /// Kick loading off (re-assign `src` for images, `load()` for video).
    fn begin_load(&self);

    /// Attach a listener for this element's events.
    fn subscribe(&self) -> broadcast::Receiver<MediaEvent>;
}

/// A stylesheet's rules could not be read (cross-origin or not loaded).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Stylesheet rules not accessible: {reason}")]
pub struct StyleSheetAccessError {
    pub reason: String,
}

/// A registered stylesheet.
pub trait StyleSheet: Send + Sync + fmt::Debug {
    fn href(&self) -> Option<String>;

    /// Number of readable rules.
    fn rule_count(&self) -> Result<usize, StyleSheetAccessError>;
}

/// The document font set (`document.fonts`).
#[async_trait]
pub trait FontSet: Send + Sync + fmt::Debug {
    /// Resolves once every declared font has loaded or failed.
    async fn ready(&self);
}
