//! Day-by-day, round-by-round driver.
//!
//! Order of play is fixed: day, then ad group, then keyword, then that
//! keyword's rounds for the day. Every pseudo-draw comes from a generator
//! seeded by (run seed, keyword, round index), so the order is what makes a run
//! reproducible, and nothing here may be reordered or parallelized.

use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::auction::{resolve_outcome, AuctionResolver};
use crate::bidders::{bidder_for, BidDecision, BidProposerTrait, PerformanceToDate};
use crate::campaign::{CampaignConfig, Device};
use crate::competition::{hour_for_round, KeywordMarket};
use crate::error::ConfigError;
use crate::extensions::ctr_multiplier;
use crate::logger::{sanitize_filename, FileReceiver, LogEvent, Logger};
use crate::matching::NegativeKeywords;
use crate::pacing::{PacingController, PacingPhase};
use crate::quality::{DayCtr, KeywordHistory, QualityBreakdown, QualityModel};
use crate::results::{ratio_or, CampaignTotals, DailyKeywordRecord, Diagnostic, DiagnosticKind, SimulationResult};
use crate::seed::{KeywordKey, RunSeed, SeedScheme};
use crate::settings::SimulationSettings;
use crate::{logln, warnln};

/// Write one CSV line per auction round to the variant's rounds file
pub static VERBOSE_ROUNDS: AtomicBool = AtomicBool::new(false);

const ROUND_CSV_HEADER: &str = "day,ad_group,keyword,round,hour,device,bid,effective_bid,quality,ad_rank,competitors,position,cpc,clicked,converted";

/// Historical aggregate counters of one keyword, folded once per resolved round
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeywordCounters {
    pub impressions: u64,
    pub clicks: u64,
    pub cost: f64,
    pub conversions: u64,
    pub revenue: f64,
}

/// One keyword's day in progress
#[derive(Debug, Clone, Copy, Default)]
struct DayCounters {
    counters: KeywordCounters,
    position_sum: u64,
    expected_clicks: f64,
    eligible: u64,
    lost_budget: u64,
    lost_rank: u64,
    filtered_negative: u64,
    filtered_schedule: u64,
}

/// Everything the run mutates for one keyword
struct KeywordState {
    ad_group: usize,
    keyword: usize,
    key: KeywordKey,
    market: KeywordMarket,
    /// Query hits a campaign or ad group negative; never auctioned
    blocked: bool,
    base_rounds: u32,
    conversion_rate: f64,
    counters: KeywordCounters,
    history: KeywordHistory,
    prior_bid: f64,
    last_day: KeywordCounters,
    days_run: u32,
    /// Rounds resolved for this keyword since the start of the run
    rounds_run: u64,
}

impl KeywordState {
    fn performance_to_date(&self, budget_share: f64) -> PerformanceToDate {
        PerformanceToDate {
            impressions: self.counters.impressions,
            clicks: self.counters.clicks,
            cost: self.counters.cost,
            conversions: self.counters.conversions,
            revenue: self.counters.revenue,
            days_elapsed: self.days_run,
            last_day_clicks: self.last_day.clicks,
            last_day_conversions: self.last_day.conversions,
            prior_bid: self.prior_bid,
            budget_share,
        }
    }
}

/// Mutable state of a single run. Owned by the run, never shared.
pub struct SimulationState {
    keywords: Vec<KeywordState>,
    pacing: PacingController,
    records: Vec<DailyKeywordRecord>,
    diagnostics: Vec<Diagnostic>,
}

/// A validated campaign ready to be simulated
pub struct Simulation {
    config: CampaignConfig,
    settings: SimulationSettings,
    seed: RunSeed,
    bidder: Box<dyn BidProposerTrait>,
    quality: QualityModel,
    resolver: AuctionResolver,
}

impl Simulation {
    /// Validate the configuration and fix the strategy and seed for the run
    pub fn new(config: CampaignConfig, settings: SimulationSettings) -> Result<Self, ConfigError> {
        config.validate(&settings)?;
        let seed = RunSeed::derive(SeedScheme::V1, &config);
        let bidder = bidder_for(&config.strategy, &settings);
        let quality = QualityModel::new(settings.ctr_feedback);
        let resolver = AuctionResolver::new(&settings);
        Ok(Self { config, settings, seed, bidder, quality, resolver })
    }

    fn initial_state(&self) -> SimulationState {
        let campaign_negatives = &self.config.targeting.negative_keywords;
        let mut keywords = Vec::with_capacity(self.config.keyword_count());
        for (ag_index, ad_group) in self.config.ad_groups.iter().enumerate() {
            let negatives = NegativeKeywords::parse(campaign_negatives.iter().chain(ad_group.negative_keywords.iter()));
            for (kw_index, keyword) in ad_group.keywords.iter().enumerate() {
                let key = KeywordKey::new(ad_group, keyword);
                let metrics = keyword.metrics.clone().unwrap_or_default();
                let base_rounds = match metrics.daily_searches {
                    Some(searches) if searches.is_finite() && searches >= 1.0 => {
                        (searches.round() as u64).min(self.settings.max_rounds_per_day as u64) as u32
                    }
                    _ => self.settings.default_rounds_per_day.min(self.settings.max_rounds_per_day),
                };
                let base_cvr = metrics.conversion_rate.unwrap_or(self.settings.base_conversion_rate);
                keywords.push(KeywordState {
                    ad_group: ag_index,
                    keyword: kw_index,
                    market: KeywordMarket::new(keyword, &key, &self.seed, &self.settings),
                    key,
                    blocked: negatives.is_hit(&keyword.text),
                    base_rounds,
                    conversion_rate: (base_cvr * keyword.match_type.conversion_factor()).clamp(0.0, 1.0),
                    counters: KeywordCounters::default(),
                    history: KeywordHistory::default(),
                    prior_bid: keyword.effective_bid(ad_group.default_bid),
                    last_day: KeywordCounters::default(),
                    days_run: 0,
                    rounds_run: 0,
                });
            }
        }
        SimulationState {
            keywords,
            pacing: PacingController::new(self.config.daily_budget, &self.settings),
            records: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Run every simulated day. Always completes.
    pub fn run(&self, logger: &mut Logger) -> SimulationResult {
        let mut state = self.initial_state();

        logln!(logger, LogEvent::Simulation, "Simulating '{}' over {} days, {} keywords, strategy {}",
            self.config.name, self.config.num_days(), state.keywords.len(), self.bidder.get_bidding_type());
        logln!(logger, LogEvent::Simulation, "Seed {:?}/{:016x}", self.seed.scheme, self.seed.value);
        for kw in &state.keywords {
            let keyword = &self.config.ad_groups[kw.ad_group].keywords[kw.keyword];
            logln!(logger, LogEvent::Simulation, "  {} [{}]: market cpc {:.2}, {} competitors, {} rounds/day{}",
                keyword.text, keyword.match_type.as_str(), kw.market.market_cpc, kw.market.base_count, kw.base_rounds,
                if kw.blocked { ", blocked by negatives" } else { "" });
        }
        if logger.is_enabled(LogEvent::Round) {
            logln!(logger, LogEvent::Round, "{}", ROUND_CSV_HEADER);
        }

        for day_index in 0..self.config.num_days() {
            self.run_day(day_index, &mut state, logger);
        }

        let totals = CampaignTotals::from_records(&state.records);
        let result = SimulationResult {
            campaign: self.config.name.clone(),
            seed: self.seed,
            records: state.records,
            totals,
            diagnostics: state.diagnostics,
        };
        result.printout(logger, LogEvent::Simulation);
        result
    }

    fn run_day(&self, day_index: u32, state: &mut SimulationState, logger: &mut Logger) {
        let date = self.config.date_for_day(day_index);
        let weekday = self.config.weekday_for_day(day_index);
        let volume = self.config.volume_multiplier_for_day(day_index);
        let budget_share = self.config.daily_budget / state.keywords.len().max(1) as f64;

        state.pacing.start_day();

        let rounds_today: Vec<u32> = state
            .keywords
            .iter()
            .map(|kw| ((kw.base_rounds as f64 * volume).round() as u32).max(1))
            .collect();
        let total_rounds: u32 = rounds_today.iter().sum();
        let mut rounds_done: u32 = 0;

        for (kw_index, rounds) in rounds_today.iter().enumerate() {
            let kw = &mut state.keywords[kw_index];
            let ad_group = &self.config.ad_groups[kw.ad_group];
            let keyword = &ad_group.keywords[kw.keyword];
            let final_url = ad_group.final_url.as_deref().or(self.config.final_url.as_deref());
            let extension_ctr = ctr_multiplier(&ad_group.extensions);

            // Strategy bid and quality are fixed for the day
            let decision = self.bidder.next_bid(keyword.effective_bid(ad_group.default_bid), &kw.performance_to_date(budget_share));
            let quality = self.quality.score(keyword, ad_group, final_url, &kw.history, day_index as usize);
            record_clamps(day_index, &keyword.text, &decision, &quality, &mut state.diagnostics, logger);
            let qs = quality.score;

            let mut day = DayCounters::default();
            for round in 0..*rounds {
                let elapsed = ratio_or(rounds_done as f64, total_rounds as f64, 0.0);
                rounds_done += 1;
                let round_index = kw.rounds_run;
                kw.rounds_run += 1;

                let hour = hour_for_round(round, *rounds);
                let device = Device::for_round(round);

                if kw.blocked {
                    day.filtered_negative += 1;
                    continue;
                }
                if let Some(schedule) = &self.config.targeting.schedule {
                    if !schedule.is_active(weekday, hour) {
                        day.filtered_schedule += 1;
                        continue;
                    }
                }
                day.eligible += 1;

                let device_bid = decision.bid * self.config.targeting.device_bid_adjustments.for_device(device);
                let throttle = state.pacing.throttle(device_bid, elapsed);
                if throttle.budget_capped() {
                    record_cap(&mut state.diagnostics, logger, day_index, &keyword.text, DiagnosticKind::BudgetCapped, throttle.uncapped_bid, throttle.effective_bid);
                }
                if !throttle.participate {
                    match state.pacing.state().phase {
                        PacingPhase::Constrained | PacingPhase::Exhausted => day.lost_budget += 1,
                        _ => day.lost_rank += 1,
                    }
                    continue;
                }

                let mut rng = self.seed.round_rng(&kw.key, round_index);
                let competitors = kw.market.generate(round_index, hour, &mut rng);
                let auction = self.resolver.run(throttle.effective_bid, qs, &competitors);
                let outcome = resolve_outcome(&auction, qs, device.ctr_factor() * extension_ctr, kw.conversion_rate, &mut rng);
                if auction.is_shown() && auction.cpc_capped() {
                    record_cap(&mut state.diagnostics, logger, day_index, &keyword.text, DiagnosticKind::CpcCapped, auction.uncapped_cpc, auction.cpc);
                }

                let mut folded = KeywordCounters::default();
                if auction.is_shown() {
                    folded.impressions = 1;
                    day.position_sum += auction.position as u64;
                    day.expected_clicks += outcome.expected_ctr;
                } else {
                    day.lost_rank += 1;
                }
                if outcome.clicked {
                    folded.clicks = 1;
                    folded.cost = auction.cpc;
                    state.pacing.record_spend(auction.cpc);
                }
                if outcome.converted {
                    folded.conversions = 1;
                    folded.revenue = self.settings.value_per_conversion;
                }
                fold(&mut kw.counters, &folded);
                fold(&mut day.counters, &folded);

                if logger.is_enabled(LogEvent::Round) {
                    logln!(logger, LogEvent::Round, "{},{},{},{},{},{:?},{:.4},{:.4},{:.3},{:.4},{},{},{:.4},{},{}",
                        day_index, ad_group.name, keyword.text, round_index, hour, device, device_bid, throttle.effective_bid,
                        qs.value(), auction.ad_rank, competitors.len(), auction.position, auction.cpc,
                        outcome.clicked as u8, outcome.converted as u8);
                }
            }

            kw.history.push_day(DayCtr {
                impressions: day.counters.impressions,
                clicks: day.counters.clicks,
                expected_clicks: day.expected_clicks,
            });
            kw.prior_bid = decision.bid;
            kw.last_day = day.counters;
            kw.days_run += 1;

            let record = daily_record(date, day_index, &ad_group.name, keyword, decision.bid, qs.value(), &day);
            logln!(logger, LogEvent::Day, "{} {}: bid {:.2} qs {:.1} impr {} clicks {} conv {} cost {:.2} IS {:.0}%",
                date, keyword.text, record.bid, record.quality_score, record.impressions, record.clicks,
                record.conversions, record.cost, record.impression_share * 100.0);
            state.records.push(record);
        }

        let pacing = state.pacing.state();
        logln!(logger, LogEvent::Day, "{} spent {:.2} of {:.2} ({:?})", date, pacing.spent(), pacing.budget_total, pacing.phase);
    }

    /// Run with per-variant log files under `log/<scenario>/`
    pub fn run_variant(&self, variant_description: &str, scenario_name: &str, variant_name: &str, logger: &mut Logger) -> Result<SimulationResult, Box<dyn Error>> {
        let dir = PathBuf::from("log").join(sanitize_filename(scenario_name));
        let variant_receiver_id = logger.add_receiver(FileReceiver::new(
            &dir.join(format!("variant-{}.log", sanitize_filename(variant_name))),
            vec![LogEvent::Simulation, LogEvent::Day],
        )?);
        let rounds_receiver_id = if VERBOSE_ROUNDS.load(Ordering::Relaxed) {
            Some(logger.add_receiver(FileReceiver::new(
                &dir.join(format!("rounds-{}.csv", sanitize_filename(variant_name))),
                vec![LogEvent::Round],
            )?))
        } else {
            None
        };

        logln!(logger, LogEvent::Simulation, "\n=== {} ===", variant_description);
        let result = self.run(logger);
        result.printout(logger, LogEvent::Scenario);

        if let Some(id) = rounds_receiver_id {
            logger.remove_receiver(id);
        }
        logger.remove_receiver(variant_receiver_id);
        Ok(result)
    }
}

fn fold(into: &mut KeywordCounters, round: &KeywordCounters) {
    into.impressions += round.impressions;
    into.clicks += round.clicks;
    into.cost += round.cost;
    into.conversions += round.conversions;
    into.revenue += round.revenue;
}

fn record_clamps(day_index: u32, keyword: &str, decision: &BidDecision, quality: &QualityBreakdown, diagnostics: &mut Vec<Diagnostic>, logger: &mut Logger) {
    if let Some(original) = decision.clamped_from {
        warnln!(logger, LogEvent::Round, "day {} '{}': bid step {:.4} clamped to {:.4}", day_index, keyword, original, decision.bid);
        diagnostics.push(Diagnostic {
            day_index,
            keyword: keyword.to_string(),
            kind: DiagnosticKind::BidStepClamped,
            original,
            clamped_to: decision.bid,
        });
    }
    if quality.clamped {
        warnln!(logger, LogEvent::Round, "day {} '{}': quality {:.4} clamped to {:.4}", day_index, keyword, quality.unclamped, quality.score.value());
        diagnostics.push(Diagnostic {
            day_index,
            keyword: keyword.to_string(),
            kind: DiagnosticKind::QualityClamped,
            original: quality.unclamped,
            clamped_to: quality.score.value(),
        });
    }
}

/// A round-level cap: the CPC held at the bid, or the bid held at the remaining budget
fn record_cap(diagnostics: &mut Vec<Diagnostic>, logger: &mut Logger, day_index: u32, keyword: &str, kind: DiagnosticKind, original: f64, capped_to: f64) {
    warnln!(logger, LogEvent::Round, "day {} '{}': {:?} {:.4} capped to {:.4}", day_index, keyword, kind, original, capped_to);
    diagnostics.push(Diagnostic {
        day_index,
        keyword: keyword.to_string(),
        kind,
        original,
        clamped_to: capped_to,
    });
}

fn daily_record(date: chrono::NaiveDate, day_index: u32, ad_group: &str, keyword: &crate::campaign::Keyword, bid: f64, quality_score: f64, day: &DayCounters) -> DailyKeywordRecord {
    let c = &day.counters;
    let eligible = day.eligible as f64;
    DailyKeywordRecord {
        date,
        day_index,
        ad_group: ad_group.to_string(),
        keyword: keyword.text.clone(),
        match_type: keyword.match_type,
        impressions: c.impressions,
        clicks: c.clicks,
        conversions: c.conversions,
        cost: c.cost,
        revenue: c.revenue,
        avg_position: ratio_or(day.position_sum as f64, c.impressions as f64, 0.0),
        avg_cpc: ratio_or(c.cost, c.clicks as f64, 0.0),
        quality_score,
        bid,
        eligible_rounds: day.eligible,
        lost_budget_rounds: day.lost_budget,
        lost_rank_rounds: day.lost_rank,
        filtered_negative: day.filtered_negative,
        filtered_schedule: day.filtered_schedule,
        impression_share: ratio_or(c.impressions as f64, eligible, 0.0),
        lost_is_budget: ratio_or(day.lost_budget as f64, eligible, 0.0),
        lost_is_rank: ratio_or(day.lost_rank as f64, eligible, 0.0),
    }
}

/// Simulate with default settings and no logging
pub fn simulate(config: &CampaignConfig) -> Result<SimulationResult, ConfigError> {
    simulate_with(config, &SimulationSettings::default(), &mut Logger::new())
}

pub fn simulate_with(config: &CampaignConfig, settings: &SimulationSettings, logger: &mut Logger) -> Result<SimulationResult, ConfigError> {
    let simulation = Simulation::new(config.clone(), settings.clone())?;
    Ok(simulation.run(logger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{AdGroup, AdSchedule, BiddingStrategyConfig, Keyword, KeywordMetrics, MatchType, Targeting};
    use crate::extensions::{AdExtension, ExtensionType};
    use crate::logger::MemoryReceiver;
    use crate::pacing::PacingMode;
    use crate::seasonality::Industry;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn running_shoes(daily_budget: f64, strategy: BiddingStrategyConfig) -> CampaignConfig {
        CampaignConfig::new("Running Shoes Spring", date(2024, 4, 1), date(2024, 4, 30), daily_budget, strategy)
            .with_ad_group(AdGroup::new("Running Shoes", 1.0, vec![
                Keyword::new("running shoes", MatchType::Exact).with_max_bid(2.0),
            ]))
    }

    fn multi_keyword() -> CampaignConfig {
        CampaignConfig::new("Outdoor", date(2024, 5, 1), date(2024, 5, 14), 40.0, BiddingStrategyConfig::ManualCpc)
            .with_ad_group(AdGroup::new("Trail", 1.2, vec![
                Keyword::new("trail running shoes", MatchType::Phrase),
                Keyword::new("buy hiking boots", MatchType::Broad).with_max_bid(1.8),
            ]).with_headlines(&["Trail Running Shoes"]).with_final_url("https://outdoor.com/trail"))
            .with_ad_group(AdGroup::new("Camping", 0.9, vec![
                Keyword::new("camping tent", MatchType::Exact),
            ]))
    }

    #[test]
    fn test_manual_cpc_scenario_thirty_records() {
        let config = running_shoes(50.0, BiddingStrategyConfig::ManualCpc);
        let result = simulate(&config).unwrap();
        assert_eq!(result.records.len(), 30);
        assert!(result.records.iter().all(|r| r.keyword == "running shoes"));
        assert!(result.totals.total_spend <= 30.0 * 50.0);
        assert!(result.totals.total_impressions > 0);

        let again = simulate(&config).unwrap();
        assert_eq!(result.totals, again.totals);
    }

    #[test]
    fn test_runs_are_identical() {
        let config = multi_keyword();
        let a = simulate(&config).unwrap();
        let b = simulate(&config).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_campaign_name_changes_trajectory() {
        let a = simulate(&multi_keyword()).unwrap();
        let mut renamed = multi_keyword();
        renamed.name = "Outdoor 2".to_string();
        let b = simulate(&renamed).unwrap();
        assert_ne!(a.seed, b.seed);
        assert_ne!(a.records, b.records);
    }

    #[test]
    fn test_smaller_budget_gets_fewer_impressions() {
        let rich = simulate(&running_shoes(50.0, BiddingStrategyConfig::ManualCpc)).unwrap();
        let poor = simulate(&running_shoes(5.0, BiddingStrategyConfig::ManualCpc)).unwrap();
        assert!(poor.totals.total_impressions < rich.totals.total_impressions);
        assert!(poor.records.iter().any(|r| r.lost_budget_rounds > 0));
    }

    #[test]
    fn test_daily_spend_within_budget() {
        for budget in [1.0, 5.0, 20.0, 50.0] {
            let mut config = multi_keyword();
            config.daily_budget = budget;
            for mode in [PacingMode::Standard, PacingMode::Accelerated] {
                let settings = SimulationSettings { pacing_mode: mode, ..Default::default() };
                let result = simulate_with(&config, &settings, &mut Logger::new()).unwrap();
                for (day, spend) in result.daily_spend() {
                    assert!(spend <= budget * (1.0 + 1e-9), "{}: spent {} of {}", day, spend, budget);
                }
            }
        }
    }

    #[test]
    fn test_higher_bid_never_loses_impressions() {
        let settings = SimulationSettings { ctr_feedback: false, pacing_mode: PacingMode::Accelerated, ..Default::default() };
        let mut previous = 0;
        for bid in [0.2, 0.5, 1.0, 2.0, 4.0, 8.0] {
            let config = CampaignConfig::new("Sensitivity", date(2024, 6, 1), date(2024, 6, 7), 1.0e9, BiddingStrategyConfig::ManualCpc)
                .with_ad_group(AdGroup::new("Shoes", bid, vec![Keyword::new("buy cheap running shoes", MatchType::Broad)]));
            // same name and keyword text keep the seed identical across bids
            let result = simulate_with(&config, &settings, &mut Logger::new()).unwrap();
            assert!(result.totals.total_impressions >= previous, "bid {} dropped impressions", bid);
            previous = result.totals.total_impressions;
        }
    }

    #[test]
    fn test_bid_sensitivity_under_default_settings() {
        // standard pacing and CTR feedback on; a budget this size never binds
        let mut previous = 0;
        for step in 1..=40 {
            let bid = step as f64 * 0.1;
            let config = CampaignConfig::new("Running Shoes Spring", date(2024, 4, 1), date(2024, 4, 30), 1.0e6, BiddingStrategyConfig::ManualCpc)
                .with_ad_group(AdGroup::new("Running Shoes", 1.0, vec![
                    Keyword::new("running shoes", MatchType::Exact).with_max_bid(bid),
                ]));
            let result = simulate(&config).unwrap();
            assert!(result.records.iter().all(|r| r.lost_budget_rounds == 0), "bid {:.1} lost rounds to budget", bid);
            assert!(result.totals.total_impressions >= previous, "bid {:.1} dropped impressions", bid);
            previous = result.totals.total_impressions;
        }
    }

    #[test]
    fn test_budget_cap_recorded_as_diagnostic() {
        // a $1 day cannot carry a $2 bid even on the first round
        let config = CampaignConfig::new("Tight", date(2024, 4, 1), date(2024, 4, 3), 1.0, BiddingStrategyConfig::ManualCpc)
            .with_ad_group(AdGroup::new("Running Shoes", 2.0, vec![Keyword::new("running shoes", MatchType::Exact)]));
        let result = simulate(&config).unwrap();
        let capped: Vec<&Diagnostic> = result.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::BudgetCapped).collect();
        assert!(!capped.is_empty());
        assert_eq!((capped[0].day_index, capped[0].original, capped[0].clamped_to), (0, 2.0, 1.0));
        assert!(capped.iter().all(|d| d.clamped_to < d.original));
    }

    #[test]
    fn test_cpc_cap_recorded_as_diagnostic() {
        // every competitor outranks us and the reserve is above the bid
        let settings = SimulationSettings { max_slots: 20, reserve_cpc: 0.5, ctr_feedback: false, ..Default::default() };
        let config = CampaignConfig::new("Underbid", date(2024, 4, 1), date(2024, 4, 7), 1.0e6, BiddingStrategyConfig::ManualCpc)
            .with_ad_group(AdGroup::new("Running Shoes", 0.3, vec![
                Keyword::new("running shoes", MatchType::Exact)
                    .with_metrics(KeywordMetrics { suggested_bid: Some(3.0), ..Default::default() }),
            ]));
        let result = simulate_with(&config, &settings, &mut Logger::new()).unwrap();
        let capped: Vec<&Diagnostic> = result.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::CpcCapped).collect();
        assert!(!capped.is_empty());
        for d in capped {
            assert_relative_eq!(d.original, 0.5);
            assert_relative_eq!(d.clamped_to, 0.3);
        }
        for r in &result.records {
            if r.clicks > 0 {
                assert!(r.avg_cpc <= 0.3 + 1e-9);
            }
        }
    }

    #[test]
    fn test_target_cpa_cold_start_falls_back_to_seed_bid() {
        let config = running_shoes(50.0, BiddingStrategyConfig::TargetCpa { target_cpa: 10.0 })
            .with_ad_group(AdGroup::new("Starter", 1.0, vec![Keyword::new("beginner running shoes", MatchType::Exact)]));
        let result = simulate(&config).unwrap();
        let records: Vec<_> = result.records_for("beginner running shoes").collect();
        let seed_bid = bidder_for(&config.strategy, &SimulationSettings::default()).seed_bid(1.0);
        for pair in records.windows(2) {
            if pair[0].conversions == 0 && pair[0].day_index == 0 {
                assert_eq!(pair[1].bid, seed_bid);
            }
        }
        assert_eq!(records[0].bid, seed_bid);
        for r in &result.records {
            assert!(r.bid.is_finite() && r.bid > 0.0);
        }
    }

    #[test]
    fn test_automated_bids_step_within_bounds() {
        for strategy in [
            BiddingStrategyConfig::TargetCpa { target_cpa: 8.0 },
            BiddingStrategyConfig::TargetRoas { target_roas: 3.0 },
            BiddingStrategyConfig::MaximizeConversions { bid_ceiling: 4.0 },
        ] {
            let mut config = multi_keyword();
            config.strategy = strategy;
            config.end_date = date(2024, 6, 30);
            let result = simulate(&config).unwrap();
            for keyword in ["trail running shoes", "buy hiking boots", "camping tent"] {
                let bids: Vec<f64> = result.records_for(keyword).map(|r| r.bid).collect();
                for pair in bids.windows(2) {
                    assert!(pair[1] >= 0.5 * pair[0] - 1e-12 && pair[1] <= 2.0 * pair[0] + 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_quality_and_cpc_bounds_in_records() {
        let result = simulate(&multi_keyword()).unwrap();
        for r in &result.records {
            assert!((1.0..=10.0).contains(&r.quality_score));
            if r.clicks > 0 {
                assert!(r.avg_cpc <= r.bid + 1e-9);
            }
            assert!(r.impression_share + r.lost_is_budget + r.lost_is_rank <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_negative_keywords_filter_rounds() {
        let config = multi_keyword().with_targeting(Targeting {
            negative_keywords: vec!["[camping tent]".to_string(), "\"hiking\"".to_string()],
            ..Default::default()
        });
        let result = simulate(&config).unwrap();
        for r in result.records.iter().filter(|r| r.keyword != "trail running shoes") {
            assert_eq!(r.impressions, 0);
            assert!(r.filtered_negative > 0);
        }
        assert!(result.records_for("trail running shoes").any(|r| r.impressions > 0));
    }

    #[test]
    fn test_ad_group_negatives_stay_in_their_group() {
        let config = CampaignConfig::new("Outdoor", date(2024, 5, 1), date(2024, 5, 14), 40.0, BiddingStrategyConfig::ManualCpc)
            .with_ad_group(AdGroup::new("Trail", 1.2, vec![
                Keyword::new("trail running shoes", MatchType::Phrase),
                Keyword::new("buy hiking boots", MatchType::Broad),
            ]).with_negative_keywords(&["boots"]))
            .with_ad_group(AdGroup::new("Camping", 0.9, vec![
                Keyword::new("camping boots", MatchType::Exact).with_max_bid(3.0),
            ]));
        let result = simulate(&config).unwrap();
        for r in result.records_for("buy hiking boots") {
            assert_eq!(r.impressions, 0);
            assert_eq!(r.eligible_rounds, 0);
            assert!(r.filtered_negative > 0);
        }
        for keyword in ["trail running shoes", "camping boots"] {
            assert!(result.records_for(keyword).all(|r| r.filtered_negative == 0 && r.eligible_rounds > 0));
        }
        assert!(result.records_for("camping boots").map(|r| r.impressions).sum::<u64>() > 0);
    }

    #[test]
    fn test_extensions_bring_more_clicks() {
        let plain = running_shoes(1.0e6, BiddingStrategyConfig::ManualCpc);
        let mut extended = plain.clone();
        extended.ad_groups[0] = extended.ad_groups[0].clone().with_extensions(vec![
            AdExtension::new(ExtensionType::Sitelink, "Trail shoes"),
            AdExtension::new(ExtensionType::Promotion, "20% off"),
            AdExtension::new(ExtensionType::Image, "Shoe photo"),
        ]);
        let settings = SimulationSettings { ctr_feedback: false, ..Default::default() };
        let a = simulate_with(&plain, &settings, &mut Logger::new()).unwrap();
        let b = simulate_with(&extended, &settings, &mut Logger::new()).unwrap();
        for (e, p) in b.records.iter().zip(&a.records) {
            assert!(e.quality_score > p.quality_score || e.quality_score == 10.0);
        }
        assert!(b.totals.total_clicks > a.totals.total_clicks);
    }

    #[test]
    fn test_industry_shapes_daily_rounds() {
        // Friday 2024-11-29 and Saturday 2024-11-30
        let config = |industry| {
            CampaignConfig::new("Seasonal", date(2024, 11, 29), date(2024, 11, 30), 1.0e6, BiddingStrategyConfig::ManualCpc)
                .with_ad_group(AdGroup::new("Gifts", 1.0, vec![Keyword::new("gift ideas", MatchType::Broad)]))
                .with_industry(industry)
        };
        let rounds = |industry| -> Vec<u64> {
            simulate(&config(industry)).unwrap().records.iter().map(|r| r.eligible_rounds + r.filtered_negative + r.filtered_schedule).collect()
        };
        let retail = rounds(Industry::Retail);
        let b2b = rounds(Industry::B2b);
        // 300 x 1.10 x 1.30, 300 x 1.20 x 1.30
        assert_eq!(retail, vec![429, 468]);
        // 300 x 1.00 x 1.05, 300 x 0.60 x 1.05
        assert_eq!(b2b, vec![315, 189]);
    }

    #[test]
    fn test_business_hours_schedule_skips_weekends() {
        let config = multi_keyword().with_targeting(Targeting { schedule: Some(AdSchedule::business_hours()), ..Default::default() });
        let result = simulate(&config).unwrap();
        for r in &result.records {
            let weekday = config.weekday_for_day(r.day_index);
            if weekday >= 5 {
                assert_eq!(r.eligible_rounds, 0);
                assert_eq!(r.impressions, 0);
            } else {
                assert!(r.filtered_schedule > 0);
            }
        }
    }

    #[test]
    fn test_each_keyword_walks_the_full_day_of_hours() {
        let config = multi_keyword().with_targeting(Targeting { schedule: Some(AdSchedule::business_hours()), ..Default::default() });
        let result = simulate(&config).unwrap();
        for r in result.records.iter().filter(|r| config.weekday_for_day(r.day_index) < 5) {
            let rounds = (r.eligible_rounds + r.filtered_schedule) as u32;
            let off_hours = (0..rounds).filter(|round| !(9..18).contains(&hour_for_round(*round, rounds))).count() as u64;
            assert_eq!(r.filtered_schedule, off_hours, "{} on day {}", r.keyword, r.day_index);
        }
    }

    #[test]
    fn test_rejects_bad_config_before_running() {
        let mut config = running_shoes(50.0, BiddingStrategyConfig::ManualCpc);
        config.daily_budget = 0.0;
        assert_eq!(simulate(&config), Err(ConfigError::NonPositiveBudget(0.0)));

        let empty = CampaignConfig::new("Empty", date(2024, 1, 1), date(2024, 1, 5), 10.0, BiddingStrategyConfig::ManualCpc);
        assert!(matches!(simulate(&empty), Err(ConfigError::NoKeywords(_))));
    }

    #[test]
    fn test_round_log_has_one_line_per_auction() {
        let config = CampaignConfig::new("Tiny", date(2024, 1, 1), date(2024, 1, 1), 100.0, BiddingStrategyConfig::ManualCpc)
            .with_ad_group(AdGroup::new("Group", 1.0, vec![Keyword::new("running shoes", MatchType::Exact)]));
        let mut logger = Logger::new();
        let (receiver, lines) = MemoryReceiver::new(vec![LogEvent::Round]);
        logger.add_receiver(receiver);
        let result = simulate_with(&config, &SimulationSettings::default(), &mut logger).unwrap();

        let text = lines.borrow();
        let data_lines = text.lines().filter(|l| !l.starts_with("day,") && !l.starts_with("WARNING")).count() as u64;
        let r = &result.records[0];
        assert_eq!(data_lines, r.eligible_rounds - r.lost_budget_rounds);
        assert!(text.starts_with(ROUND_CSV_HEADER));
    }

    #[test]
    fn test_result_serializes_to_json() {
        let result = simulate(&running_shoes(20.0, BiddingStrategyConfig::ManualCpc)).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let back: SimulationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.records.len(), result.records.len());
        assert_eq!(back.seed, result.seed);
    }
}
