//! Visual elements the preloader mutates.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A DOM element whose classes and inline styles the preloader toggles.
pub trait PageElement: Send + Sync + fmt::Debug {
    fn add_class(&self, class: &str);

    fn has_class(&self, class: &str) -> bool;

    fn set_style(&self, property: &str, value: &str);
}

/// One line of staged preloader text.
#[derive(Debug, Clone)]
pub struct RevealLine {
    pub element: Arc<dyn PageElement>,
    /// Raw `data-delay` attribute, in seconds.
    pub delay_attr: Option<String>,
}

impl RevealLine {
    pub fn new(element: Arc<dyn PageElement>, delay_attr: Option<String>) -> Self {
        Self {
            element,
            delay_attr,
        }
    }

    /// Reveal delay relative to the start of the line's message part.
    ///
    /// Missing, negative or unparsable attributes reveal immediately.
    pub fn delay(&self) -> Duration {
        self.delay_attr
            .as_deref()
            .map_or(Duration::ZERO, parse_reveal_delay)
    }
}

/// Longest delay a `data-delay` attribute can ask for.
pub const MAX_REVEAL_DELAY: Duration = Duration::from_secs(60);

/// Parse a `data-delay` value expressed in (fractional) seconds.
///
/// Values above [`MAX_REVEAL_DELAY`] are clamped to it.
pub fn parse_reveal_delay(raw: &str) -> Duration {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map_or(Duration::ZERO, |delay| delay.min(MAX_REVEAL_DELAY))
}

/// The staged loading message: a container and its two parts.
#[derive(Debug, Clone)]
pub struct LoadingMessage {
    pub container: Arc<dyn PageElement>,
    /// `.message-part-1 .text-line` elements.
    pub part_one: Vec<RevealLine>,
    /// `.message-part-2 .blur-text-line` elements.
    pub part_two: Vec<RevealLine>,
}
