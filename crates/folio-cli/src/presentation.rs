//! Terminal output formatting.

use std::fmt::Write;

use folio_sim::BuiltinScenario;

use crate::handlers::simulate::SimulationOutcome;

/// One line per built-in scenario: name, expected settle, summary.
pub fn format_catalogue(builtins: &[BuiltinScenario]) -> String {
    let width = builtins.iter().map(|b| b.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for builtin in builtins {
        let settle = builtin
            .scenario()
            .expected_settle_ms
            .map_or_else(|| "-".to_string(), |ms| format!("{ms} ms"));
        let _ = writeln!(
            out,
            "{:<width$}  {:>9}  {}",
            builtin.name, settle, builtin.summary
        );
    }
    out
}

/// Human-readable simulation summary.
pub fn format_outcome(outcome: &SimulationOutcome) -> String {
    let report = &outcome.report;
    let mut out = String::new();
    let _ = writeln!(out, "Scenario:        {}", outcome.scenario);
    let _ = writeln!(out, "Path:            {:?}", report.path);
    let _ = writeln!(out, "Settled by:      {}", report.trigger);
    let _ = writeln!(out, "Settled after:   {} ms", report.settled_after_ms);
    let _ = writeln!(out, "Revealed after:  {} ms", report.revealed_after_ms);
    let _ = writeln!(out, "Hero elements:   {}", report.hero_elements_revealed);
    match (outcome.expected_settle_ms, outcome.matches_expectation()) {
        (Some(expected), Some(true)) => {
            let _ = writeln!(out, "Expectation:     met ({expected} ms)");
        }
        (Some(expected), _) => {
            let _ = writeln!(out, "Expectation:     MISSED (expected {expected} ms)");
        }
        (None, _) => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::PreloaderReport;
    use folio_sim::BUILTINS;

    #[test]
    fn test_catalogue_lists_every_builtin() {
        let text = format_catalogue(&BUILTINS);
        assert_eq!(text.lines().count(), BUILTINS.len());
        assert!(text.contains("stalled-network"));
        assert!(text.contains("30000 ms"));
    }

    #[test]
    fn test_outcome_reports_missed_expectation() {
        let report: PreloaderReport = serde_json::from_value(serde_json::json!({
            "startedAt": "2026-01-01T00:00:00Z",
            "path": "aggregate",
            "trigger": { "path": "global_fallback" },
            "settledAfterMs": 30_000,
            "revealedAfterMs": 31_600,
            "finalProgress": 100.0,
            "heroElementsRevealed": 3
        }))
        .unwrap();
        let outcome = SimulationOutcome {
            scenario: "custom".to_string(),
            report,
            expected_settle_ms: Some(2500),
        };

        let text = format_outcome(&outcome);
        assert!(text.contains("Path:            Aggregate"));
        assert!(text.contains("Settled by:      global fallback"));
        assert!(text.contains("MISSED (expected 2500 ms)"));
    }
}
