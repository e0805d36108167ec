//! Single exact-match keyword on a manual $2.00 bid with a comfortable budget.
//!
//! Variants A and B are the same campaign run twice; the run must be
//! reproducible down to the totals.

use chrono::NaiveDate;

use searchsim::campaign::{AdGroup, BiddingStrategyConfig, CampaignConfig, Keyword, MatchType};
use searchsim::logger::Logger;
use searchsim::settings::SimulationSettings;
use searchsim::simulation::Simulation;

use crate::scenarios::Checks;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "manual_cpc_baseline",
    run,
    campaign,
});

const DAILY_BUDGET: f64 = 50.0;

fn campaign() -> CampaignConfig {
    let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap_or_default();
    CampaignConfig::new("Running Shoes Baseline", start, end, DAILY_BUDGET, BiddingStrategyConfig::ManualCpc)
        .with_ad_group(AdGroup::new("Running Shoes", 1.0, vec![
            Keyword::new("running shoes", MatchType::Exact).with_max_bid(2.0),
        ]))
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let config = campaign();
    let days = config.num_days();

    let simulation = Simulation::new(config, SimulationSettings::default())?;
    let result_a = simulation.run_variant("Manual CPC, $2.00 bid, $50/day", scenario_name, "first", logger)?;
    let result_b = simulation.run_variant("Same campaign, second run", scenario_name, "repeat", logger)?;

    let mut checks = Checks::new(scenario_name, logger);

    let records = result_a.records_for("running shoes").count();
    checks.check(records == days as usize, format!("One record per day for the keyword: {} == {}", records, days), logger);

    let cap = days as f64 * DAILY_BUDGET;
    checks.check(result_a.totals.total_spend <= cap,
        format!("Total spend stays within the budget: {:.2} <= {:.2}", result_a.totals.total_spend, cap), logger);

    checks.check(result_a.totals.total_impressions > 0,
        format!("Keyword is shown: {} impressions", result_a.totals.total_impressions), logger);

    checks.check(result_a.totals == result_b.totals,
        format!("Repeat run reproduces totals: spend {:.4} vs {:.4}, clicks {} vs {}",
            result_a.totals.total_spend, result_b.totals.total_spend, result_a.totals.total_clicks, result_b.totals.total_clicks), logger);

    checks.finish()
}
