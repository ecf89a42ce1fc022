//! Command handlers.
//!
//! Handlers are thin: resolve input, call into the preloader, format output.

pub mod scenarios;
pub mod simulate;
