//! Core domain types, configuration and port definitions for the folio
//! preloader.
//!
//! Nothing in this crate touches a real page: the browser is reached through
//! the traits in [`ports`], and the orchestration lives in `folio-preloader`.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod ports;
pub mod report;
pub mod resource;
pub mod session;

// Re-export commonly used types for convenience
pub use config::{ConfigError, PreloaderConfig};
pub use ports::{
    DocumentReadyState, FontSet, LoadingMessage, MediaElement, MediaEvent, PageDocument,
    PageElement, RevealLine, StyleSheet, StyleSheetAccessError,
};
pub use report::PreloaderReport;
pub use resource::{
    LoadProgress, MediaReadyState, ReadinessState, ResourceHandle, ResourceId, ResourceKind,
    ResourceTarget, Settled,
};
pub use session::{
    CompletionLatch, CompletionTicket, PreloaderSession, ProgressMeter, SelectorPath,
    SelectorState, SettleTrigger,
};
