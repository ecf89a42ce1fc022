//! Summary of a finished preloader run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SelectorPath, SettleTrigger};

/// Produced once the preloader has been removed and hero content revealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloaderReport {
    /// Wall-clock session start.
    pub started_at: DateTime<Utc>,
    pub path: SelectorPath,
    pub trigger: SettleTrigger,
    /// Session start to the winning settle.
    pub settled_after_ms: u64,
    /// Session start to the hero reveal.
    pub revealed_after_ms: u64,
    pub final_progress: f64,
    pub hero_elements_revealed: usize,
}

impl PreloaderReport {
    /// Whether the global deadline, rather than readiness, ended the wait.
    pub const fn hit_fallback(&self) -> bool {
        matches!(self.trigger, SettleTrigger::GlobalFallback)
    }
}
