//! Simulate command handler.
//!
//! Replays a scenario through the real preloader against the simulated
//! document and prints the resulting report.

use anyhow::{Context, Result};
use folio_core::{PreloaderConfig, PreloaderReport};
use folio_preloader::Preloader;
use folio_sim::{PageScenario, SimDocument, builtin};
use tokio::runtime::Builder;
use tracing::{info, warn};

use crate::parser::SimulateArgs;
use crate::presentation::format_outcome;

/// A finished simulation.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub scenario: String,
    pub report: PreloaderReport,
    pub expected_settle_ms: Option<u64>,
}

impl SimulationOutcome {
    /// `None` when the scenario pins no settle time.
    pub fn matches_expectation(&self) -> Option<bool> {
        self.expected_settle_ms
            .map(|expected| expected == self.report.settled_after_ms)
    }
}

/// Resolve the scenario named by the arguments.
pub fn load_scenario(args: &SimulateArgs) -> Result<PageScenario> {
    if let Some(path) = &args.file {
        let mut scenario = PageScenario::from_json_file(path)
            .with_context(|| format!("Failed to load scenario from {}", path.display()))?;
        if scenario.name.is_empty() {
            scenario.name = path
                .file_stem()
                .map_or_else(|| "unnamed".to_string(), |stem| stem.to_string_lossy().into_owned());
        }
        return Ok(scenario);
    }

    let name = args
        .builtin
        .as_deref()
        .context("Either a scenario file or --builtin is required")?;
    Ok(builtin(name)?)
}

/// Run `scenario` on the current runtime with the default configuration.
pub async fn run_scenario(scenario: PageScenario, seed: Option<u64>) -> Result<SimulationOutcome> {
    let name = scenario.name.clone();
    let expected_settle_ms = scenario.expected_settle_ms;
    info!(scenario = %name, "Starting simulation");

    let document = SimDocument::new(scenario);
    let mut preloader = Preloader::new(document, PreloaderConfig::default())?;
    if let Some(seed) = seed {
        preloader = preloader.with_seed(seed);
    }
    let report = preloader.run().await?;

    Ok(SimulationOutcome {
        scenario: name,
        report,
        expected_settle_ms,
    })
}

/// Execute the simulate command.
pub fn execute(args: &SimulateArgs) -> Result<()> {
    let scenario = load_scenario(args)?;

    // One runtime per run, so the clock can start paused.
    let runtime = Builder::new_current_thread()
        .enable_all()
        .start_paused(args.virtual_clock)
        .build()
        .context("Failed to start the tokio runtime")?;
    let outcome = runtime.block_on(run_scenario(scenario, args.seed))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        print!("{}", format_outcome(&outcome));
    }

    if outcome.matches_expectation() == Some(false) {
        warn!(
            scenario = %outcome.scenario,
            expected = ?outcome.expected_settle_ms,
            actual = outcome.report.settled_after_ms,
            "Settle time differs from the scenario's expectation"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{ReadinessState, SelectorPath, SettleTrigger};
    use std::fs;
    use tempfile::tempdir;

    fn args(file: Option<std::path::PathBuf>, builtin: Option<&str>) -> SimulateArgs {
        SimulateArgs {
            file,
            builtin: builtin.map(ToString::to_string),
            virtual_clock: true,
            seed: Some(3),
            json: false,
        }
    }

    #[test]
    fn test_load_builtin() {
        let scenario = load_scenario(&args(None, Some("priority-never-ready"))).unwrap();
        assert_eq!(scenario.name, "priority-never-ready");
        assert!(load_scenario(&args(None, Some("missing"))).is_err());
    }

    #[test]
    fn test_load_file_names_unnamed_scenario() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("slow-cdn.json");
        fs::write(&path, r#"{ "load_at_ms": 400 }"#).unwrap();

        let scenario = load_scenario(&args(Some(path), None)).unwrap();
        assert_eq!(scenario.name, "slow-cdn");
        assert_eq!(scenario.load_at_ms, Some(400));
    }

    #[test]
    fn test_load_bad_file_has_context() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_scenario(&args(Some(path), None)).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_priority_timeout_scenario() {
        let scenario = builtin("priority-never-ready").unwrap();
        let outcome = run_scenario(scenario, Some(3)).await.unwrap();

        assert_eq!(outcome.report.path, SelectorPath::Priority);
        assert_eq!(
            outcome.report.trigger,
            SettleTrigger::Priority {
                hero: ReadinessState::TimedOut
            }
        );
        assert_eq!(outcome.report.settled_after_ms, 15_000);
        assert_eq!(outcome.report.revealed_after_ms, 16_600);
        assert_eq!(outcome.matches_expectation(), Some(true));
    }

    #[test]
    fn test_execute_on_virtual_clock() {
        execute(&args(None, Some("aggregate-fast"))).unwrap();
    }
}
