//! Error types for the preloader controller.
//!
//! Resource failures never show up here: they settle as degraded outcomes.
//! These errors cover misconfiguration and a broken runtime.

use folio_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreloaderError {
    /// The configuration failed validation
    #[error("Invalid preloader configuration: {0}")]
    Config(#[from] ConfigError),

    /// Both settle paths ended without reporting (their tasks were aborted)
    #[error("Every settle path ended without completing the preloader")]
    SettlePathsLost,
}
