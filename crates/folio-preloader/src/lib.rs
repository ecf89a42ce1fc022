//! Resource-gated preloader.
//!
//! Gates a page's reveal on its critical resources:
//!
//! - [`readiness`]: one future per resource, resolving ready or failed
//! - [`guard`]: deadlines and combinators over those futures
//! - [`aggregator`]: waits on every resource of the page
//! - [`selector`]: hero-video priority path or aggregate path
//! - [`controller`]: progress, messages, fallback and the completion routine
//!
//! The page is reached only through the ports in `folio_core::ports`.

pub mod aggregator;
pub mod controller;
mod error;
pub mod guard;
pub mod loader_bars;
pub mod messages;
pub mod progress;
pub mod readiness;
pub mod selector;

pub use aggregator::{AggregateReport, ResourceAggregator};
pub use controller::Preloader;
pub use error::PreloaderError;
pub use guard::{TimeoutGuard, all_settled, race, with_timeout};
pub use readiness::ReadinessSignal;
pub use selector::PrioritySelector;
