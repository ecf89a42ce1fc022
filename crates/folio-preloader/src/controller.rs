//! Preloader controller.
//!
//! Owns the session and runs every effect: progress bar, staged messages,
//! loader bars, the two settle paths and the completion routine.

use std::sync::Arc;
use std::time::Duration;

use folio_core::ports::PageDocument;
use folio_core::{
    CompletionTicket, PreloaderConfig, PreloaderReport, PreloaderSession, SelectorPath,
    SettleTrigger,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PreloaderError;
use crate::loader_bars::animate_loader_bars;
use crate::messages::stage_messages;
use crate::progress::ProgressTicker;
use crate::selector::PrioritySelector;

const FADE_OUT: &str = "fade-out";
const FADE_IN: &str = "fade-in";

/// One preloader run over one document.
pub struct Preloader {
    document: Arc<dyn PageDocument>,
    config: Arc<PreloaderConfig>,
    session: Arc<PreloaderSession>,
    rng: StdRng,
}

impl Preloader {
    /// Validate `config` and start the session clock.
    pub fn new(
        document: Arc<dyn PageDocument>,
        config: PreloaderConfig,
    ) -> Result<Self, PreloaderError> {
        config.validate()?;
        let initial = PrioritySelector::initial_state(document.as_ref());
        let session = Arc::new(PreloaderSession::new(config.progress_cap, initial));
        Ok(Self {
            document,
            config: Arc::new(config),
            session,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Use a fixed seed for progress increments.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn session(&self) -> Arc<PreloaderSession> {
        Arc::clone(&self.session)
    }

    /// Run until hero content is revealed.
    pub async fn run(self) -> Result<PreloaderReport, PreloaderError> {
        let Self {
            document,
            config,
            session,
            rng,
        } = self;

        let effects = CancellationToken::new();
        let ticker_stop = effects.child_token();

        let ticker = tokio::spawn(
            ProgressTicker::new(
                Arc::clone(&session),
                document.progress_bar(),
                config.progress_tick,
                config.progress_max_increment,
                rng,
            )
            .run(ticker_stop.clone()),
        );
        tokio::spawn(stage_messages(
            document.loading_message(),
            session.started_at(),
            config.message_reveal_after,
            config.second_message_delay,
            effects.clone(),
        ));
        tokio::spawn(animate_loader_bars(
            document.loader_bars(),
            config.loader_bar_tick,
            config.loader_bar_cycle,
            effects.clone(),
        ));

        let settle_paths = CancellationToken::new();
        let (tickets, mut winner) = mpsc::unbounded_channel();

        let selector = PrioritySelector::new(
            Arc::clone(&document),
            Arc::clone(&config),
            Arc::clone(&session),
        );
        let path = selector.path();
        tokio::spawn({
            let session = Arc::clone(&session);
            let cancel = settle_paths.clone();
            let tickets = tickets.clone();
            async move {
                let trigger = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    trigger = selector.settle() => trigger,
                };
                if let Some(ticket) = session.try_complete(trigger) {
                    let _ = tickets.send(ticket);
                }
            }
        });

        tokio::spawn({
            let session = Arc::clone(&session);
            let cancel = settle_paths.clone();
            let deadline = session.started_at() + config.global_fallback;
            async move {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    () = sleep_until(deadline) => {}
                }
                if let Some(ticket) = session.try_complete(SettleTrigger::GlobalFallback) {
                    warn!(
                        pending = ?session.pending_labels(),
                        "Global fallback reached, forcing completion"
                    );
                    let _ = tickets.send(ticket);
                }
            }
        });

        let ticket = winner.recv().await.ok_or(PreloaderError::SettlePathsLost)?;
        settle_paths.cancel();

        ticker_stop.cancel();
        if let Err(e) = ticker.await {
            warn!(error = %e, "Progress ticker ended abnormally");
        }

        let report = complete(&document, &config, &session, &ticket, path, &effects).await;
        Ok(report)
    }
}

/// The completion routine. Runs once, for the ticket holder.
async fn complete(
    document: &Arc<dyn PageDocument>,
    config: &PreloaderConfig,
    session: &PreloaderSession,
    ticket: &CompletionTicket,
    path: SelectorPath,
    effects: &CancellationToken,
) -> PreloaderReport {
    let final_progress = session.progress().finish(ticket);
    if let Some(bar) = document.progress_bar() {
        bar.set_style("width", "100%");
    }

    let preloader = document.preloader();
    sleep(config.fade_out_delay).await;
    if let Some(preloader) = &preloader {
        preloader.add_class(FADE_OUT);
        debug!("Preloader fading out");
    }

    sleep(config.removal_delay).await;
    if let Some(preloader) = &preloader {
        preloader.set_style("display", "none");
    }
    effects.cancel();
    debug!("Preloader removed");

    sleep(config.hero_reveal_delay).await;
    let hero = document.hero_content();
    for (i, element) in hero.iter().enumerate() {
        let delay = config
            .hero_stagger
            .saturating_mul(u32::try_from(i).unwrap_or(u32::MAX));
        element.set_style("animation-delay", &format!("{}ms", delay.as_millis()));
        element.add_class(FADE_IN);
    }

    let revealed_after = session.elapsed();
    info!(
        trigger = %ticket.trigger(),
        settled_after = ?ticket.settled_after(),
        ?revealed_after,
        hero_elements = hero.len(),
        "Hero content revealed"
    );

    PreloaderReport {
        started_at: session.started_wall(),
        path,
        trigger: ticket.trigger(),
        settled_after_ms: millis(ticket.settled_after()),
        revealed_after_ms: millis(revealed_after),
        final_progress,
        hero_elements_revealed: hero.len(),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    use folio_core::ports::{
        DocumentReadyState, FontSet, LoadingMessage, MediaElement, PageElement, StyleSheet,
    };
    use folio_core::ConfigError;
    use folio_sim::{PageScenario, SimDocument};
    use mockall::mock;
    use tokio::sync::watch;

    mock! {
        pub Element {}

        impl PageElement for Element {
            fn add_class(&self, class: &str);
            fn has_class(&self, class: &str) -> bool;
            fn set_style(&self, property: &str, value: &str);
        }
    }

    // `PageElement` requires `Debug`, which the generated mock lacks.
    impl fmt::Debug for MockElement {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("MockElement")
        }
    }

    /// A simulated page whose `#preloader` is a mock.
    #[derive(Debug)]
    struct MockedPreloaderPage {
        inner: Arc<SimDocument>,
        preloader: Arc<MockElement>,
    }

    impl PageDocument for MockedPreloaderPage {
        fn preloader(&self) -> Option<Arc<dyn PageElement>> {
            Some(self.preloader.clone())
        }
        fn progress_bar(&self) -> Option<Arc<dyn PageElement>> {
            self.inner.progress_bar()
        }
        fn loading_message(&self) -> Option<LoadingMessage> {
            self.inner.loading_message()
        }
        fn loader_bars(&self) -> Vec<Arc<dyn PageElement>> {
            self.inner.loader_bars()
        }
        fn hero_content(&self) -> Vec<Arc<dyn PageElement>> {
            self.inner.hero_content()
        }
        fn hero_video(&self) -> Option<Arc<dyn MediaElement>> {
            self.inner.hero_video()
        }
        fn images(&self) -> Vec<Arc<dyn MediaElement>> {
            self.inner.images()
        }
        fn videos(&self) -> Vec<Arc<dyn MediaElement>> {
            self.inner.videos()
        }
        fn stylesheets(&self) -> Vec<Arc<dyn StyleSheet>> {
            self.inner.stylesheets()
        }
        fn fonts(&self) -> Option<Arc<dyn FontSet>> {
            self.inner.fonts()
        }
        fn preload(&self, url: &str) -> Arc<dyn MediaElement> {
            self.inner.preload(url)
        }
        fn is_global_defined(&self, name: &str) -> bool {
            self.inner.is_global_defined(name)
        }
        fn ready_state(&self) -> watch::Receiver<DocumentReadyState> {
            self.inner.ready_state()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_effects_run_once() {
        let mut preloader = MockElement::new();
        preloader
            .expect_add_class()
            .withf(|class| class == FADE_OUT)
            .times(1)
            .return_const(());
        preloader
            .expect_set_style()
            .withf(|property, value| property == "display" && value == "none")
            .times(1)
            .return_const(());

        let page = Arc::new(MockedPreloaderPage {
            inner: SimDocument::detached(PageScenario::default().loaded_at(0)),
            preloader: Arc::new(preloader),
        });
        let config = PreloaderConfig::default().without_critical_resources();
        let report = Preloader::new(page, config)
            .unwrap()
            .with_seed(1)
            .run()
            .await
            .unwrap();

        assert_eq!(report.path, SelectorPath::Aggregate);
        assert_eq!(
            report.trigger,
            SettleTrigger::Aggregate {
                ready: 0,
                degraded: 0
            }
        );
        assert_eq!(report.settled_after_ms, 2000);
        assert_eq!(report.revealed_after_ms, 3600);
        assert!((report.final_progress - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let document = SimDocument::detached(PageScenario::default());
        let config = PreloaderConfig {
            global_fallback: Duration::ZERO,
            ..PreloaderConfig::default()
        };
        let result = Preloader::new(document, config);
        assert!(matches!(
            result,
            Err(PreloaderError::Config(ConfigError::ZeroDuration("global_fallback")))
        ));
    }
}
