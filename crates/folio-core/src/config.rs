//! Preloader timing configuration.
//!
//! The values are fixed for the page; [`PreloaderConfig::default`] is what
//! production uses. The struct exists so components receive their timings by
//! injection instead of reaching for globals.

use std::time::Duration;

/// Delay after the last aggregated resource settles.
pub const STABILIZATION_DELAY: Duration = Duration::from_millis(2000);

/// Maximum wait for the hero video before proceeding.
pub const PRIORITY_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Unconditional completion deadline, measured from session start.
pub const GLOBAL_FALLBACK: Duration = Duration::from_millis(30_000);

/// Delay between reaching 100% and fading the preloader out.
pub const FADE_OUT_DELAY: Duration = Duration::from_millis(1000);

/// Delay between fade-out and removing the preloader.
pub const REMOVAL_DELAY: Duration = Duration::from_millis(500);

/// Delay between removing the preloader and revealing hero content.
pub const HERO_REVEAL_DELAY: Duration = Duration::from_millis(100);

/// Per-element animation stagger for hero content.
pub const HERO_STAGGER: Duration = Duration::from_millis(200);

/// Stylesheet and script URLs the page cannot render properly without.
pub const CRITICAL_URLS: [&str; 5] = [
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css",
    "https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@700&display=swap",
    "https://fonts.googleapis.com/css2?family=Fuzzy+Bubbles:wght@700&display=swap",
    "https://fonts.googleapis.com/css2?family=La+Belle+Aurore&display=swap",
    "https://cdn.jsdelivr.net/npm/particles.js@2.0.0/particles.min.js",
];

/// Global defined by `particles.js` once it has executed.
pub const CRITICAL_SCRIPT_GLOBAL: &str = "particlesJS";

/// Accent color of the active loader bar.
pub const LOADER_BAR_ACTIVE: &str = "#b6f500";

/// Color of idle loader bars.
pub const LOADER_BAR_IDLE: &str = "#ffffff";

/// Timings and resource lists for one preloader session.
#[derive(Debug, Clone, PartialEq)]
pub struct PreloaderConfig {
    /// Progress ticker period.
    pub progress_tick: Duration,
    /// Upper bound (exclusive) of one random progress increment, in percent.
    pub progress_max_increment: f64,
    /// Progress ceiling before completion, in percent.
    pub progress_cap: f64,

    /// Elapsed time after which the loading message appears.
    pub message_reveal_after: Duration,
    /// Delay between the first and second message parts.
    pub second_message_delay: Duration,

    /// Loader bar repaint period.
    pub loader_bar_tick: Duration,
    /// Length of one dot climb across all bars.
    pub loader_bar_cycle: Duration,

    pub stabilization_delay: Duration,
    /// Extra wait for a video that already has future data.
    pub video_settle_delay: Duration,
    /// When to re-check a video that has fired no usable event.
    pub video_probe_after: Duration,
    /// Grace period for the critical script global to appear.
    pub script_grace: Duration,

    pub priority_timeout: Duration,
    pub global_fallback: Duration,

    pub fade_out_delay: Duration,
    pub removal_delay: Duration,
    pub hero_reveal_delay: Duration,
    pub hero_stagger: Duration,

    /// External URLs preloaded and awaited on the aggregate path.
    pub critical_urls: Vec<String>,
    /// Script global awaited on the aggregate path, if any.
    pub critical_script_global: Option<String>,
}

impl Default for PreloaderConfig {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(200),
            progress_max_increment: 15.0,
            progress_cap: 90.0,
            message_reveal_after: Duration::from_millis(3000),
            second_message_delay: Duration::from_millis(2000),
            loader_bar_tick: Duration::from_millis(30),
            loader_bar_cycle: Duration::from_millis(2500),
            stabilization_delay: STABILIZATION_DELAY,
            video_settle_delay: Duration::from_millis(500),
            video_probe_after: Duration::from_millis(5000),
            script_grace: Duration::from_millis(1000),
            priority_timeout: PRIORITY_TIMEOUT,
            global_fallback: GLOBAL_FALLBACK,
            fade_out_delay: FADE_OUT_DELAY,
            removal_delay: REMOVAL_DELAY,
            hero_reveal_delay: HERO_REVEAL_DELAY,
            hero_stagger: HERO_STAGGER,
            critical_urls: CRITICAL_URLS.iter().map(ToString::to_string).collect(),
            critical_script_global: Some(CRITICAL_SCRIPT_GLOBAL.to_string()),
        }
    }
}

impl PreloaderConfig {
    /// Same timings, but no fixed external URLs or script global to await.
    ///
    /// Useful when the aggregate path should only see what the document holds.
    #[must_use]
    pub fn without_critical_resources(mut self) -> Self {
        self.critical_urls.clear();
        self.critical_script_global = None;
        self
    }

    /// Check the invariants the preloader relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("progress_tick", self.progress_tick),
            ("loader_bar_tick", self.loader_bar_tick),
            ("loader_bar_cycle", self.loader_bar_cycle),
            ("priority_timeout", self.priority_timeout),
            ("global_fallback", self.global_fallback),
        ];
        if let Some((name, _)) = periods.into_iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::ZeroDuration(name));
        }

        if !(self.progress_cap > 0.0 && self.progress_cap < 100.0) {
            return Err(ConfigError::InvalidProgressCap(self.progress_cap));
        }

        if !(self.progress_max_increment.is_finite() && self.progress_max_increment > 0.0) {
            return Err(ConfigError::InvalidIncrement(self.progress_max_increment));
        }

        if self
            .critical_urls
            .iter()
            .any(|url| url.trim().is_empty())
        {
            return Err(ConfigError::EmptyUrl);
        }

        Ok(())
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Progress cap must be strictly between 0 and 100, got {0}")]
    InvalidProgressCap(f64),

    #[error("Progress increment must be a positive number, got {0}")]
    InvalidIncrement(f64),

    #[error("Critical resource URL cannot be empty")]
    EmptyUrl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PreloaderConfig::default();
        tokio_test::assert_ok!(config.validate());
        assert_eq!(config.critical_urls.len(), 5);
        assert_eq!(config.global_fallback, Duration::from_secs(30));
        assert_eq!(config.priority_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_without_critical_resources() {
        let config = PreloaderConfig::default().without_critical_resources();
        assert!(config.critical_urls.is_empty());
        assert!(config.critical_script_global.is_none());
        assert_eq!(config.stabilization_delay, STABILIZATION_DELAY);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = PreloaderConfig {
            progress_tick: Duration::ZERO,
            ..PreloaderConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("progress_tick"))
        );

        let config = PreloaderConfig {
            progress_cap: 100.0,
            ..PreloaderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProgressCap(_))
        ));

        let config = PreloaderConfig {
            progress_max_increment: f64::NAN,
            ..PreloaderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIncrement(_))
        ));

        let config = PreloaderConfig {
            critical_urls: vec!["  ".to_string()],
            ..PreloaderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyUrl));
    }
}
