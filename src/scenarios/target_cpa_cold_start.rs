//! Target CPA of $10 on a keyword starting at $1.00 with no history.
//!
//! Until the keyword has enough conversions to trust, every day must bid the
//! conservative seed instead of dividing by zero conversions.

use chrono::NaiveDate;

use searchsim::bidders::bidder_for;
use searchsim::campaign::{AdGroup, BiddingStrategyConfig, CampaignConfig, Keyword, MatchType};
use searchsim::logger::Logger;
use searchsim::settings::SimulationSettings;
use searchsim::simulation::Simulation;

use crate::scenarios::Checks;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "target_cpa_cold_start",
    run,
    campaign,
});

const STARTING_BID: f64 = 1.0;

fn campaign() -> CampaignConfig {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2024, 3, 21).unwrap_or_default();
    CampaignConfig::new("Trail Shoes CPA", start, end, 30.0, BiddingStrategyConfig::TargetCpa { target_cpa: 10.0 })
        .with_ad_group(AdGroup::new("Trail Shoes", STARTING_BID, vec![
            Keyword::new("trail running shoes", MatchType::Phrase),
        ]).with_headlines(&["Trail Running Shoes"]))
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let config = campaign();
    let settings = SimulationSettings::default();
    let seed_bid = bidder_for(&config.strategy, &settings).seed_bid(STARTING_BID);

    let result = Simulation::new(config, settings.clone())?
        .run_variant("Target CPA $10 from a cold start", scenario_name, "cold-start", logger)?;

    let mut checks = Checks::new(scenario_name, logger);

    let mut conversions_before = 0;
    let mut cold_days = 0;
    let mut off_seed = Vec::new();
    for record in result.records_for("trail running shoes") {
        if conversions_before < settings.min_conversions {
            cold_days += 1;
            if (record.bid - seed_bid).abs() > 1e-12 {
                off_seed.push(format!("day {} bid {:.4}", record.day_index, record.bid));
            }
        }
        conversions_before += record.conversions;
    }
    checks.check(cold_days > 0 && off_seed.is_empty(),
        format!("Days without enough conversions bid the seed {:.4}: {} cold days, off seed: [{}]", seed_bid, cold_days, off_seed.join(", ")), logger);

    let totals = &result.totals;
    checks.check(totals.avg_cpa.is_finite() && totals.roas.is_finite() && totals.avg_cpc.is_finite(),
        format!("Ratios stay finite: CPA {:.2}, ROAS {:.2}, CPC {:.2}", totals.avg_cpa, totals.roas, totals.avg_cpc), logger);

    checks.finish()
}
