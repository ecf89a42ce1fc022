//! Recording page element.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use folio_core::ports::PageElement;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Default)]
struct Recorded {
    /// Class name to the offset it was first added at.
    classes: BTreeMap<String, Duration>,
    class_adds: BTreeMap<String, usize>,
    styles: BTreeMap<String, String>,
    style_writes: BTreeMap<String, usize>,
}

/// A `PageElement` that records every class and style write.
///
/// Offsets are measured from the element's creation.
#[derive(Debug)]
pub struct SimElement {
    name: String,
    epoch: Instant,
    recorded: Mutex<Recorded>,
}

impl SimElement {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            epoch: Instant::now(),
            recorded: Mutex::new(Recorded::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classes currently set, sorted.
    pub fn classes(&self) -> Vec<String> {
        self.recorded().classes.keys().cloned().collect()
    }

    /// When `class` was first added, relative to creation.
    pub fn class_added_at(&self, class: &str) -> Option<Duration> {
        self.recorded().classes.get(class).copied()
    }

    /// How many times `add_class(class)` was called.
    pub fn class_adds(&self, class: &str) -> usize {
        self.recorded().class_adds.get(class).copied().unwrap_or(0)
    }

    /// Current inline value of `property`.
    pub fn style(&self, property: &str) -> Option<String> {
        self.recorded().styles.get(property).cloned()
    }

    /// How many times `property` was written.
    pub fn style_writes(&self, property: &str) -> usize {
        self.recorded()
            .style_writes
            .get(property)
            .copied()
            .unwrap_or(0)
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PageElement for SimElement {
    fn add_class(&self, class: &str) {
        let offset = self.epoch.elapsed();
        let mut recorded = self.recorded();
        recorded.classes.entry(class.to_string()).or_insert(offset);
        *recorded.class_adds.entry(class.to_string()).or_default() += 1;
        trace!(element = %self.name, class, ?offset, "Class added");
    }

    fn has_class(&self, class: &str) -> bool {
        self.recorded().classes.contains_key(class)
    }

    fn set_style(&self, property: &str, value: &str) {
        let mut recorded = self.recorded();
        recorded
            .styles
            .insert(property.to_string(), value.to_string());
        *recorded
            .style_writes
            .entry(property.to_string())
            .or_default() += 1;
        trace!(element = %self.name, property, value, "Style written");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_records_first_class_add() {
        let element = SimElement::new("preloader");
        tokio::time::advance(Duration::from_millis(40)).await;
        element.add_class("fade-out");
        tokio::time::advance(Duration::from_millis(40)).await;
        element.add_class("fade-out");

        assert!(element.has_class("fade-out"));
        assert_eq!(element.class_adds("fade-out"), 2);
        assert_eq!(
            element.class_added_at("fade-out"),
            Some(Duration::from_millis(40))
        );
        assert_eq!(element.classes(), vec!["fade-out"]);
    }

    #[test]
    fn test_records_styles() {
        let element = SimElement::new("progressBar");
        element.set_style("width", "12%");
        element.set_style("width", "30%");

        assert_eq!(element.style("width").as_deref(), Some("30%"));
        assert_eq!(element.style_writes("width"), 2);
        assert_eq!(element.style("display"), None);
        assert_eq!(element.name(), "progressBar");
    }
}
