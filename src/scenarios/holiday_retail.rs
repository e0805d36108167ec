//! Retail gift campaign over the holiday season, with and without ad
//! extensions.
//!
//! Variant A runs the bare ad group, variant B adds sitelinks, a promotion
//! and an image. Round volume follows the retail calendar in both.

use chrono::NaiveDate;

use searchsim::campaign::{AdGroup, BiddingStrategyConfig, CampaignConfig, Keyword, MatchType};
use searchsim::extensions::{AdExtension, ExtensionType};
use searchsim::logger::Logger;
use searchsim::results::DiagnosticKind;
use searchsim::seasonality::Industry;
use searchsim::settings::SimulationSettings;
use searchsim::simulation::Simulation;

use crate::scenarios::Checks;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "holiday_retail",
    run,
    campaign,
});

const DAILY_BUDGET: f64 = 500.0;

fn campaign() -> CampaignConfig {
    let start = NaiveDate::from_ymd_opt(2024, 11, 18).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default();
    CampaignConfig::new("Holiday Gifts", start, end, DAILY_BUDGET, BiddingStrategyConfig::ManualCpc)
        .with_industry(Industry::Retail)
        .with_ad_group(AdGroup::new("Gifts", 1.5, vec![
            Keyword::new("gift ideas", MatchType::Phrase),
            Keyword::new("buy gift cards", MatchType::Exact),
        ]).with_headlines(&["Gift Ideas For Everyone"]).with_final_url("https://gifts.com/ideas"))
}

fn with_extensions(config: &CampaignConfig) -> CampaignConfig {
    let mut extended = config.clone();
    for ad_group in extended.ad_groups.iter_mut() {
        ad_group.extensions = vec![
            AdExtension::new(ExtensionType::Sitelink, "Gifts under $25"),
            AdExtension::new(ExtensionType::Sitelink, "Stocking stuffers").with_quality(0.6),
            AdExtension::new(ExtensionType::Promotion, "Free gift wrap"),
            AdExtension::new(ExtensionType::Image, "Gift box"),
        ];
    }
    extended
}

/// Rounds the keyword was eligible for on `date`
fn eligible_on(result: &searchsim::SimulationResult, keyword: &str, date: NaiveDate) -> u64 {
    result.records_for(keyword).filter(|r| r.date == date).map(|r| r.eligible_rounds).sum()
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let config = campaign();
    let plain = Simulation::new(config.clone(), SimulationSettings::default())?;
    let extended = Simulation::new(with_extensions(&config), SimulationSettings::default())?;

    let result_a = plain.run_variant("Retail gifts, no extensions", scenario_name, "plain", logger)?;
    let result_b = extended.run_variant("Retail gifts, four extensions", scenario_name, "extensions", logger)?;

    let mut checks = Checks::new(scenario_name, logger);

    checks.check(result_b.totals.total_clicks > result_a.totals.total_clicks,
        format!("Extensions bring more clicks: {} > {}", result_b.totals.total_clicks, result_a.totals.total_clicks), logger);

    let christmas_eve = NaiveDate::from_ymd_opt(2024, 12, 24).unwrap_or_default();
    let christmas = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap_or_default();
    let eve = eligible_on(&result_a, "gift ideas", christmas_eve);
    let day = eligible_on(&result_a, "gift ideas", christmas);
    checks.check(day < eve, format!("Christmas Day is quieter than Christmas Eve: {} < {} rounds", day, eve), logger);

    let mid_november = NaiveDate::from_ymd_opt(2024, 11, 19).unwrap_or_default();
    let mid_december = NaiveDate::from_ymd_opt(2024, 12, 17).unwrap_or_default();
    let november = eligible_on(&result_a, "gift ideas", mid_november);
    let december = eligible_on(&result_a, "gift ideas", mid_december);
    checks.check(december > november,
        format!("December Tuesday outdraws November Tuesday: {} > {} rounds", december, november), logger);

    let budget_caps = result_b.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::BudgetCapped).count();
    checks.check(budget_caps == 0, format!("A $500 day never caps a bid at the remaining budget: {} caps", budget_caps), logger);

    checks.finish()
}
