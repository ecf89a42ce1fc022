//! Port definitions (trait abstractions) for the page environment.
//!
//! Ports define the interfaces the preloader expects from the browser.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - One trait per kind of DOM object the preloader touches
//! - Listeners are channel receivers; dropping a receiver detaches it
//! - Missing optional elements are `None`, never an error

mod document;
mod element;
mod media;

pub use document::{DocumentReadyState, PageDocument};
pub use element::{
    LoadingMessage, MAX_REVEAL_DELAY, PageElement, RevealLine, parse_reveal_delay,
};
pub use media::{FontSet, MediaElement, MediaEvent, StyleSheet, StyleSheetAccessError};
