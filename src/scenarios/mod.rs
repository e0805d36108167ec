use std::error::Error;

use searchsim::campaign::CampaignConfig;
use searchsim::logger::{LogEvent, Logger};
use searchsim::{errln, logln};

/// Function type for scenario entry functions
pub type ScenarioFn = fn(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn Error>>;

/// Entry in the scenario catalog
#[derive(Clone)]
pub struct ScenarioEntry {
    pub short_name: &'static str,
    pub run: ScenarioFn,
    /// Campaign the `charts` command renders for this scenario
    pub campaign: fn() -> CampaignConfig,
}

inventory::collect!(ScenarioEntry);

/// All registered scenarios, sorted by name
pub fn get_scenario_catalog() -> Vec<ScenarioEntry> {
    let mut entries: Vec<ScenarioEntry> = inventory::iter::<ScenarioEntry>
        .into_iter()
        .cloned()
        .collect();
    entries.sort_by_key(|entry| entry.short_name);
    entries
}

/// Collects ✓/✗ lines for a scenario and turns failures into its error
pub struct Checks<'a> {
    scenario_name: &'a str,
    errors: Vec<String>,
}

impl<'a> Checks<'a> {
    pub fn new(scenario_name: &'a str, logger: &mut Logger) -> Self {
        logln!(logger, LogEvent::Scenario, "");
        Self { scenario_name, errors: Vec::new() }
    }

    pub fn check(&mut self, passed: bool, msg: String, logger: &mut Logger) {
        if passed {
            logln!(logger, LogEvent::Scenario, "✓ {}", msg);
        } else {
            errln!(logger, LogEvent::Scenario, "✗ {}", msg);
            self.errors.push(msg);
        }
    }

    pub fn finish(self) -> Result<(), Box<dyn Error>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(format!("Scenario '{}' validation failed:\n{}", self.scenario_name, self.errors.join("\n")).into())
        }
    }
}

pub mod manual_cpc_baseline;
pub mod budget_constrained;
pub mod target_cpa_cold_start;
pub mod strategy_comparison;
pub mod holiday_retail;
