//! Priority path selection.
//!
//! The hero video decides the path. With a hero, completion waits on the
//! hero (bounded by the priority timeout) and the page load event. Without
//! one, it waits on the page load event and every aggregated resource.

use std::sync::Arc;

use folio_core::ports::PageDocument;
use folio_core::{
    PreloaderConfig, PreloaderSession, ReadinessState, SelectorPath, SelectorState, SettleTrigger,
};
use tracing::{info, warn};

use crate::aggregator::ResourceAggregator;
use crate::guard::TimeoutGuard;
use crate::readiness::{hero_ready, page_loaded};

/// Drives the selector state machine up to the settle point.
///
/// Entering `Settled` is left to the caller, which owns the completion latch.
pub struct PrioritySelector {
    document: Arc<dyn PageDocument>,
    config: Arc<PreloaderConfig>,
    session: Arc<PreloaderSession>,
    path: SelectorPath,
}

impl PrioritySelector {
    /// Initial selector state, decided synchronously from the document.
    pub fn initial_state(document: &dyn PageDocument) -> SelectorState {
        if document.hero_video().is_some() {
            SelectorState::AwaitingPriority
        } else {
            SelectorState::NoPriorityResource
        }
    }

    pub fn new(
        document: Arc<dyn PageDocument>,
        config: Arc<PreloaderConfig>,
        session: Arc<PreloaderSession>,
    ) -> Self {
        let path = if document.hero_video().is_some() {
            SelectorPath::Priority
        } else {
            session.transition(SelectorState::FallbackAggregate);
            SelectorPath::Aggregate
        };
        info!(?path, "Preloader path selected");
        Self {
            document,
            config,
            session,
            path,
        }
    }

    pub const fn path(&self) -> SelectorPath {
        self.path
    }

    /// Resolve once the chosen path's conditions hold.
    pub async fn settle(&self) -> SettleTrigger {
        match self.path {
            SelectorPath::Priority => self.settle_priority().await,
            SelectorPath::Aggregate => self.settle_aggregate().await,
        }
    }

    async fn settle_priority(&self) -> SettleTrigger {
        let hero = match self.document.hero_video() {
            Some(video) => {
                let guard = TimeoutGuard::new(self.config.priority_timeout);
                let (hero, ()) = tokio::join!(
                    guard.guard(hero_ready(video)),
                    page_loaded(Arc::clone(&self.document)),
                );
                hero
            }
            // Hero removed after selection; nothing left to prioritise.
            None => {
                page_loaded(Arc::clone(&self.document)).await;
                ReadinessState::Failed
            }
        };

        match hero {
            ReadinessState::Ready => info!("Hero video ready and page loaded"),
            ReadinessState::TimedOut => {
                warn!(timeout = ?self.config.priority_timeout, "Hero video timed out, proceeding");
            }
            _ => warn!("Hero video failed to load, proceeding"),
        }
        self.session.transition(SelectorState::PriorityReady);
        SettleTrigger::Priority { hero }
    }

    async fn settle_aggregate(&self) -> SettleTrigger {
        let aggregator = ResourceAggregator::new(
            Arc::clone(&self.document),
            Arc::clone(&self.config),
            Arc::clone(&self.session),
        );
        let ((), report) = tokio::join!(
            page_loaded(Arc::clone(&self.document)),
            aggregator.settle_all(),
        );
        info!(
            ready = report.ready(),
            degraded = report.degraded(),
            "Page loaded and all resources settled"
        );
        report.trigger()
    }
}
