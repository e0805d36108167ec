//! The baseline keyword once with a $50 daily budget and once with $5.
//!
//! The small budget has to be paced, so it sits out rounds and collects
//! strictly fewer impressions while never overspending a day.

use chrono::NaiveDate;

use searchsim::campaign::{AdGroup, BiddingStrategyConfig, CampaignConfig, Keyword, MatchType};
use searchsim::logger::Logger;
use searchsim::settings::SimulationSettings;
use searchsim::simulation::Simulation;

use crate::scenarios::Checks;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "budget_constrained",
    run,
    campaign,
});

const SMALL_BUDGET: f64 = 5.0;
const LARGE_BUDGET: f64 = 50.0;

fn campaign_with_budget(daily_budget: f64) -> CampaignConfig {
    let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap_or_default();
    CampaignConfig::new("Running Shoes Budget", start, end, daily_budget, BiddingStrategyConfig::ManualCpc)
        .with_ad_group(AdGroup::new("Running Shoes", 1.0, vec![
            Keyword::new("running shoes", MatchType::Exact).with_max_bid(2.0),
        ]))
}

fn campaign() -> CampaignConfig {
    campaign_with_budget(SMALL_BUDGET)
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let large = Simulation::new(campaign_with_budget(LARGE_BUDGET), SimulationSettings::default())?
        .run_variant("Daily budget $50", scenario_name, "large", logger)?;
    let small = Simulation::new(campaign_with_budget(SMALL_BUDGET), SimulationSettings::default())?
        .run_variant("Daily budget $5", scenario_name, "small", logger)?;

    let mut checks = Checks::new(scenario_name, logger);

    checks.check(small.totals.total_impressions < large.totals.total_impressions,
        format!("Small budget gets fewer impressions: {} < {}", small.totals.total_impressions, large.totals.total_impressions), logger);

    let worst_day = small.daily_spend().into_iter().map(|(_, spend)| spend).fold(0.0_f64, f64::max);
    checks.check(worst_day <= SMALL_BUDGET + 1e-9,
        format!("No day overspends the small budget: max {:.4} <= {:.2}", worst_day, SMALL_BUDGET), logger);

    let lost_budget: u64 = small.records.iter().map(|r| r.lost_budget_rounds).sum();
    checks.check(lost_budget > 0, format!("Pacing holds the small budget out of rounds: {} rounds lost to budget", lost_budget), logger);

    checks.finish()
}
