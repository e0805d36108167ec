//! The same two-group campaign under each of the four bidding strategies.
//!
//! Variants:
//!
//! - A: Manual CPC
//!
//! - B: Target CPA $15
//!
//! - C: Target ROAS 400%
//!
//! - D: Maximize conversions with a $2.50 ceiling
//!
//! Automated strategies may move a bid at most to half or double the previous
//! day, and no strategy may overspend a day.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use searchsim::campaign::{AdGroup, BiddingStrategyConfig, CampaignConfig, Keyword, MatchType};
use searchsim::logger::{LogEvent, Logger};
use searchsim::logln;
use searchsim::results::SimulationResult;
use searchsim::settings::SimulationSettings;
use searchsim::simulation::Simulation;

use crate::scenarios::Checks;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "strategy_comparison",
    run,
    campaign,
});

const DAILY_BUDGET: f64 = 30.0;
const BID_CEILING: f64 = 2.5;

fn campaign_with(strategy: BiddingStrategyConfig) -> CampaignConfig {
    let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2024, 6, 29).unwrap_or_default();
    CampaignConfig::new("Outdoor Strategies", start, end, DAILY_BUDGET, strategy)
        .with_final_url("https://outdoor.com/shop")
        .with_ad_group(AdGroup::new("Running", 1.5, vec![
            Keyword::new("running shoes", MatchType::Exact).with_max_bid(2.0),
            Keyword::new("buy trail running shoes", MatchType::Phrase),
        ]).with_headlines(&["Running Shoes Sale", "Trail Running Shoes"]))
        .with_ad_group(AdGroup::new("Hiking", 1.0, vec![
            Keyword::new("hiking boots", MatchType::Broad),
        ]).with_headlines(&["Best Hiking Boots"]))
}

fn campaign() -> CampaignConfig {
    campaign_with(BiddingStrategyConfig::TargetCpa { target_cpa: 15.0 })
}

/// Day-over-day bid ratios outside [0.5, 2.0], per keyword
fn step_violations(result: &SimulationResult) -> Vec<String> {
    let mut violations = Vec::new();
    let keywords: BTreeSet<&str> = result.records.iter().map(|r| r.keyword.as_str()).collect();
    for keyword in keywords {
        let bids: Vec<f64> = result.records_for(keyword).map(|r| r.bid).collect();
        for pair in bids.windows(2) {
            let ratio = pair[1] / pair[0];
            if !(0.5 - 1e-9..=2.0 + 1e-9).contains(&ratio) {
                violations.push(format!("{}: {:.4} -> {:.4}", keyword, pair[0], pair[1]));
            }
        }
    }
    violations
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let variants = [
        ("Manual CPC", "manual", BiddingStrategyConfig::ManualCpc),
        ("Target CPA $15", "target-cpa", BiddingStrategyConfig::TargetCpa { target_cpa: 15.0 }),
        ("Target ROAS 400%", "target-roas", BiddingStrategyConfig::TargetRoas { target_roas: 4.0 }),
        ("Maximize conversions, $2.50 ceiling", "max-conversions", BiddingStrategyConfig::MaximizeConversions { bid_ceiling: BID_CEILING }),
    ];

    let mut results = Vec::with_capacity(variants.len());
    for (description, variant_name, strategy) in variants {
        let simulation = Simulation::new(campaign_with(strategy), SimulationSettings::default())?;
        results.push((description, simulation.run_variant(description, scenario_name, variant_name, logger)?));
    }

    let mut checks = Checks::new(scenario_name, logger);

    for (description, result) in &results {
        let violations = step_violations(result);
        checks.check(violations.is_empty(),
            format!("{}: daily bid steps stay within half to double: [{}]", description, violations.join(", ")), logger);

        let worst_day = result.daily_spend().into_iter().map(|(_, spend)| spend).fold(0.0_f64, f64::max);
        checks.check(worst_day <= DAILY_BUDGET + 1e-9,
            format!("{}: no day overspends: max {:.4} <= {:.2}", description, worst_day, DAILY_BUDGET), logger);
    }

    let manual = &results[0].1;
    let manual_constant = ["running shoes", "buy trail running shoes", "hiking boots"].iter().all(|keyword| {
        let bids: Vec<f64> = manual.records_for(keyword).map(|r| r.bid).collect();
        bids.windows(2).all(|pair| pair[0] == pair[1])
    });
    checks.check(manual_constant, "Manual CPC keeps every keyword on its configured bid".to_string(), logger);

    let max_conversions = &results[3].1;
    let highest = max_conversions.records.iter().map(|r| r.bid).fold(0.0_f64, f64::max);
    checks.check(highest <= BID_CEILING,
        format!("Maximize conversions respects its ceiling: {:.4} <= {:.2}", highest, BID_CEILING), logger);

    for (description, result) in &results {
        logln!(logger, LogEvent::Scenario, "{}: spend {:.2}, conversions {}, CPA {:.2}, ROAS {:.2}",
            description, result.totals.total_spend, result.totals.total_conversions, result.totals.avg_cpa, result.totals.roas);
    }

    checks.finish()
}
