//! Watched resource types.
//!
//! A [`ResourceHandle`] identifies one resource the preloader waits on. It is
//! created when the document is enumerated, never mutated, and consumed by the
//! readiness signal that watches it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ports::{FontSet, MediaElement, StyleSheet};

/// Category of a watched resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Image,
    Video,
    FontSet,
    Stylesheet,
    Script,
}

impl ResourceKind {
    /// Classify an external URL preloaded through a `<link>` element.
    ///
    /// Scripts are recognised by their `.js` path; everything else (CSS,
    /// font CSS endpoints) is treated as a stylesheet.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.ends_with(".js") {
            Self::Script
        } else {
            Self::Stylesheet
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::FontSet => "font-set",
            Self::Stylesheet => "stylesheet",
            Self::Script => "script",
        };
        f.write_str(name)
    }
}

/// Session-unique resource identifier, assigned in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Terminal (or not yet terminal) state of one watched resource.
///
/// `Failed` and `TimedOut` are both "proceed anyway" outcomes: the preloader
/// never blocks on a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    Pending,
    Ready,
    Failed,
    TimedOut,
}

impl ReadinessState {
    /// Whether the state is one of the three terminal states.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether the resource settled without reporting success.
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// HTML media ready-state ladder.
///
/// Ordered so that `state >= MediaReadyState::HaveFutureData` reads the same
/// as `video.readyState >= 3`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MediaReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Network state of a loadable element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadProgress {
    /// Loading has not started.
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// The object behind a [`ResourceHandle`].
#[derive(Debug, Clone)]
pub enum ResourceTarget {
    /// An `<img>`, `<video>` or preload `<link>` element.
    Element(Arc<dyn MediaElement>),
    /// The document font set.
    Fonts(Arc<dyn FontSet>),
    /// A registered stylesheet.
    Stylesheet(Arc<dyn StyleSheet>),
    /// A global the page expects a third-party script to define.
    ScriptGlobal(String),
}

/// One watched resource.
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    id: ResourceId,
    kind: ResourceKind,
    label: String,
    target: ResourceTarget,
}

impl ResourceHandle {
    pub fn new(
        id: ResourceId,
        kind: ResourceKind,
        label: impl Into<String>,
        target: ResourceTarget,
    ) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            target,
        }
    }

    pub const fn id(&self) -> ResourceId {
        self.id
    }

    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Human-readable label, for diagnostics only.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn target(&self) -> &ResourceTarget {
        &self.target
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.id, self.label)
    }
}

/// A settled resource, as reported by its readiness signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settled {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub label: String,
    pub state: ReadinessState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_url() {
        assert_eq!(
            ResourceKind::from_url("https://cdn.jsdelivr.net/npm/particles.js@2.0.0/particles.min.js"),
            ResourceKind::Script
        );
        assert_eq!(
            ResourceKind::from_url(
                "https://fonts.googleapis.com/css2?family=La+Belle+Aurore&display=swap"
            ),
            ResourceKind::Stylesheet
        );
        assert_eq!(
            ResourceKind::from_url("https://example.com/app.js?v=3"),
            ResourceKind::Script
        );
    }

    #[test]
    fn test_media_ready_state_ordering() {
        assert!(MediaReadyState::HaveEnoughData > MediaReadyState::HaveFutureData);
        assert!(MediaReadyState::HaveCurrentData < MediaReadyState::HaveFutureData);
        assert_eq!(MediaReadyState::default(), MediaReadyState::HaveNothing);
    }

    #[test]
    fn test_readiness_classification() {
        assert!(!ReadinessState::Pending.is_settled());
        assert!(ReadinessState::Ready.is_settled());
        assert!(!ReadinessState::Ready.is_degraded());
        assert!(ReadinessState::Failed.is_degraded());
        assert!(ReadinessState::TimedOut.is_degraded());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&ReadinessState::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");

        let state: MediaReadyState = serde_json::from_str("\"have_future_data\"").unwrap();
        assert_eq!(state, MediaReadyState::HaveFutureData);
    }
}
