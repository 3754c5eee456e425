//! Shared test fixtures for integration tests.

use radio_energy_sim::config::{ScenarioConfig, TrafficStepConfig};
use radio_energy_sim::sim::engine::{Engine, RunResult};

/// Baseline scenario: one transmission, receive window, standby, sleep.
pub fn baseline_config() -> ScenarioConfig {
    ScenarioConfig::baseline()
}

/// Depletion scenario extended with a post-depletion sleep request, so the
/// frozen-mode behavior is observable from the script alone.
pub fn depletion_config_with_late_sleep() -> ScenarioConfig {
    let mut config = ScenarioConfig::depletion();
    config.traffic.step.push(TrafficStepConfig {
        at_s: 9.0,
        mode: "sleep".to_string(),
        power_dbm: None,
    });
    config
}

/// Builds and runs an engine for the given scenario.
pub fn run_scenario(config: &ScenarioConfig) -> RunResult {
    let errors = config.validate();
    assert!(errors.is_empty(), "scenario should be valid: {errors:?}");
    Engine::new(config).run()
}
