//! Resource aggregation for the fallback path.

use std::sync::Arc;

use folio_core::ports::PageDocument;
use folio_core::{
    PreloaderConfig, PreloaderSession, ReadinessState, ResourceHandle, ResourceId, ResourceKind,
    ResourceTarget, SettleTrigger, Settled,
};
use futures_util::future::join_all;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::readiness::ReadinessSignal;

/// Outcome of one aggregate wait.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateReport {
    /// Settled outcomes, in enumeration order.
    pub outcomes: Vec<Settled>,
}

impl AggregateReport {
    pub fn ready(&self) -> usize {
        self.count(|state| state == ReadinessState::Ready)
    }

    /// Failed or timed out.
    pub fn degraded(&self) -> usize {
        self.count(ReadinessState::is_degraded)
    }

    pub fn trigger(&self) -> SettleTrigger {
        SettleTrigger::Aggregate {
            ready: self.ready(),
            degraded: self.degraded(),
        }
    }

    fn count(&self, predicate: impl Fn(ReadinessState) -> bool) -> usize {
        self.outcomes.iter().filter(|s| predicate(s.state)).count()
    }
}

/// Collects every resource the page depends on and waits for all of them.
pub struct ResourceAggregator {
    document: Arc<dyn PageDocument>,
    config: Arc<PreloaderConfig>,
    session: Arc<PreloaderSession>,
}

impl ResourceAggregator {
    pub fn new(
        document: Arc<dyn PageDocument>,
        config: Arc<PreloaderConfig>,
        session: Arc<PreloaderSession>,
    ) -> Self {
        Self {
            document,
            config,
            session,
        }
    }

    /// Enumerate the document's resources.
    ///
    /// Critical URLs are inserted as preload links as a side effect.
    pub fn enumerate(&self) -> Vec<ResourceHandle> {
        let mut handles = Vec::new();
        let mut push = |kind: ResourceKind, label: String, target: ResourceTarget| {
            let id = ResourceId(u32::try_from(handles.len()).unwrap_or(u32::MAX));
            handles.push(ResourceHandle::new(id, kind, label, target));
        };

        for image in self.document.images() {
            let label = image.source().unwrap_or_else(|| "unnamed image".to_string());
            push(ResourceKind::Image, label, ResourceTarget::Element(image));
        }

        for video in self.document.videos() {
            let label = video.source().unwrap_or_else(|| "unnamed video".to_string());
            push(ResourceKind::Video, label, ResourceTarget::Element(video));
        }

        for url in &self.config.critical_urls {
            let link = self.document.preload(url);
            push(ResourceKind::from_url(url), url.clone(), ResourceTarget::Element(link));
        }

        if let Some(fonts) = self.document.fonts() {
            push(
                ResourceKind::FontSet,
                "document fonts".to_string(),
                ResourceTarget::Fonts(fonts),
            );
        }

        for (i, sheet) in self.document.stylesheets().into_iter().enumerate() {
            let label = sheet
                .href()
                .unwrap_or_else(|| format!("inline stylesheet {i}"));
            push(ResourceKind::Stylesheet, label, ResourceTarget::Stylesheet(sheet));
        }

        if let Some(name) = &self.config.critical_script_global {
            push(
                ResourceKind::Script,
                name.clone(),
                ResourceTarget::ScriptGlobal(name.clone()),
            );
        }

        handles
    }

    /// Wait until every resource settles, then the stabilization delay.
    ///
    /// Never fails: broken resources count as degraded. An empty document
    /// only waits out the stabilization delay.
    pub async fn settle_all(&self) -> AggregateReport {
        let handles = self.enumerate();
        info!(resources = handles.len(), "Waiting on all page resources");

        let signals = handles.into_iter().map(|handle| {
            let pending = Pending::track(&self.session, &handle);
            let signal = ReadinessSignal::watch(handle, &self.document, &self.config);
            async move {
                let settled = signal.await;
                drop(pending);
                settled
            }
        });
        let outcomes = join_all(signals).await;

        let report = AggregateReport { outcomes };
        debug!(
            ready = report.ready(),
            degraded = report.degraded(),
            delay = ?self.config.stabilization_delay,
            "All resources settled, stabilizing"
        );
        sleep(self.config.stabilization_delay).await;
        report
    }
}

/// Keeps a resource in the session's pending set until dropped, so a wait
/// abandoned by the selector does not leave stale labels behind.
struct Pending {
    session: Arc<PreloaderSession>,
    id: ResourceId,
}

impl Pending {
    fn track(session: &Arc<PreloaderSession>, handle: &ResourceHandle) -> Self {
        session.track(handle);
        Self {
            session: Arc::clone(session),
            id: handle.id(),
        }
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        self.session.untrack(self.id);
    }
}
