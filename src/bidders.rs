//! Bid proposers: one implementation per bidding strategy.
//!
//! Automated strategies look only at a snapshot of performance frozen at the
//! start of the day, so the bid they propose holds for the whole day.
//! Every automated step is held within [0.5, 2.0] times the prior bid.

use crate::campaign::BiddingStrategyConfig;
use crate::controller_core::{ControllerProportionalCore, RaiseWhen};
use crate::settings::SimulationSettings;

pub const MIN_STEP_FACTOR: f64 = 0.5;
pub const MAX_STEP_FACTOR: f64 = 2.0;

/// Share of the gap to the fair-share CPC closed per day
const FAIR_SHARE_APPROACH: f64 = 0.5;
/// Daily decay when conversion rate trends down
const UNFAVORABLE_DECAY: f64 = 0.9;

/// Keyword performance accumulated over the days before the current one
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceToDate {
    pub impressions: u64,
    pub clicks: u64,
    pub cost: f64,
    pub conversions: u64,
    pub revenue: f64,
    pub days_elapsed: u32,
    pub last_day_clicks: u64,
    pub last_day_conversions: u64,
    /// Bid used the previous day, the configured bid on the first day
    pub prior_bid: f64,
    /// This keyword's even share of the daily budget
    pub budget_share: f64,
}

/// A proposed bid and, when the step bound had to be enforced, the value it replaced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BidDecision {
    pub bid: f64,
    pub used_seed: bool,
    pub clamped_from: Option<f64>,
}

impl BidDecision {
    fn unchanged(bid: f64) -> Self {
        Self { bid, used_seed: false, clamped_from: None }
    }

    /// Hold `raw` within the step bound around `prior`
    fn bounded(raw: f64, prior: f64, used_seed: bool) -> Self {
        let low = prior * MIN_STEP_FACTOR;
        let high = prior * MAX_STEP_FACTOR;
        let bid = if raw.is_nan() { prior } else { raw.clamp(low, high) };
        let clamped_from = if bid != raw { Some(raw) } else { None };
        Self { bid, used_seed, clamped_from }
    }
}

pub trait BidProposerTrait {
    /// Bid to submit for the coming day. `keyword_bid` is the keyword's
    /// configured (or inherited) max CPC.
    fn next_bid(&self, keyword_bid: f64, performance: &PerformanceToDate) -> BidDecision;

    /// Fallback used until there is enough data to steer on
    fn seed_bid(&self, keyword_bid: f64) -> f64;

    fn get_bidding_type(&self) -> String;
}

/// Choose the proposer once, at setup
pub fn bidder_for(strategy: &BiddingStrategyConfig, settings: &SimulationSettings) -> Box<dyn BidProposerTrait> {
    match strategy {
        BiddingStrategyConfig::ManualCpc => Box::new(BidderManualCpc),
        BiddingStrategyConfig::TargetCpa { target_cpa } => Box::new(BidderTargetCpa {
            target_cpa: *target_cpa,
            min_conversions: settings.min_conversions,
            base_conversion_rate: settings.base_conversion_rate,
            core: ControllerProportionalCore::new(),
        }),
        BiddingStrategyConfig::TargetRoas { target_roas } => Box::new(BidderTargetRoas {
            target_roas: *target_roas,
            min_conversions: settings.min_conversions,
            expected_value_per_click: settings.base_conversion_rate * settings.value_per_conversion,
            core: ControllerProportionalCore::new(),
        }),
        BiddingStrategyConfig::MaximizeConversions { bid_ceiling } => Box::new(BidderMaximizeConversions { bid_ceiling: *bid_ceiling }),
    }
}

/// Configured max CPC, unchanged
pub struct BidderManualCpc;

impl BidProposerTrait for BidderManualCpc {
    fn next_bid(&self, keyword_bid: f64, _performance: &PerformanceToDate) -> BidDecision {
        BidDecision::unchanged(keyword_bid)
    }

    fn seed_bid(&self, keyword_bid: f64) -> f64 {
        keyword_bid
    }

    fn get_bidding_type(&self) -> String {
        "Manual CPC".to_string()
    }
}

pub struct BidderTargetCpa {
    target_cpa: f64,
    min_conversions: u64,
    base_conversion_rate: f64,
    core: ControllerProportionalCore,
}

impl BidProposerTrait for BidderTargetCpa {
    fn next_bid(&self, keyword_bid: f64, performance: &PerformanceToDate) -> BidDecision {
        let prior = performance.prior_bid;
        if performance.impressions == 0 || performance.conversions < self.min_conversions {
            return BidDecision::bounded(self.seed_bid(keyword_bid), prior, true);
        }
        let observed_cpa = performance.cost / performance.conversions as f64;
        let (_, next) = self.core.controller_next_state(self.target_cpa, observed_cpa, prior, RaiseWhen::BelowTarget);
        BidDecision::bounded(next, prior, false)
    }

    /// What a click is worth at the target if the keyword converts at the base rate
    fn seed_bid(&self, keyword_bid: f64) -> f64 {
        keyword_bid.min(self.target_cpa * self.base_conversion_rate)
    }

    fn get_bidding_type(&self) -> String {
        format!("Target CPA ({:.2})", self.target_cpa)
    }
}

pub struct BidderTargetRoas {
    target_roas: f64,
    min_conversions: u64,
    expected_value_per_click: f64,
    core: ControllerProportionalCore,
}

impl BidProposerTrait for BidderTargetRoas {
    fn next_bid(&self, keyword_bid: f64, performance: &PerformanceToDate) -> BidDecision {
        let prior = performance.prior_bid;
        if performance.impressions == 0 || performance.conversions < self.min_conversions || performance.cost <= 0.0 {
            return BidDecision::bounded(self.seed_bid(keyword_bid), prior, true);
        }
        let observed_roas = performance.revenue / performance.cost;
        let (_, next) = self.core.controller_next_state(self.target_roas, observed_roas, prior, RaiseWhen::AboveTarget);
        BidDecision::bounded(next, prior, false)
    }

    fn seed_bid(&self, keyword_bid: f64) -> f64 {
        keyword_bid.min(self.expected_value_per_click / self.target_roas)
    }

    fn get_bidding_type(&self) -> String {
        format!("Target ROAS ({:.2})", self.target_roas)
    }
}

pub struct BidderMaximizeConversions {
    bid_ceiling: f64,
}

impl BidProposerTrait for BidderMaximizeConversions {
    fn next_bid(&self, keyword_bid: f64, performance: &PerformanceToDate) -> BidDecision {
        let prior = performance.prior_bid;
        if performance.impressions == 0 || performance.clicks == 0 || performance.days_elapsed == 0 {
            return BidDecision::bounded(self.seed_bid(keyword_bid), prior, true);
        }

        let cumulative_cvr = performance.conversions as f64 / performance.clicks as f64;
        let trending_up = performance.last_day_clicks > 0
            && performance.last_day_conversions as f64 / performance.last_day_clicks as f64 >= cumulative_cvr;

        let raw = if trending_up {
            let daily_clicks = performance.clicks as f64 / performance.days_elapsed as f64;
            let fair_share_cpc = performance.budget_share / daily_clicks;
            prior + FAIR_SHARE_APPROACH * (fair_share_cpc - prior)
        } else {
            prior * UNFAVORABLE_DECAY
        };
        BidDecision::bounded(raw.min(self.bid_ceiling), prior, false)
    }

    fn seed_bid(&self, keyword_bid: f64) -> f64 {
        keyword_bid.min(self.bid_ceiling)
    }

    fn get_bidding_type(&self) -> String {
        format!("Maximize conversions (ceiling {:.2})", self.bid_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn settings() -> SimulationSettings {
        SimulationSettings::default()
    }

    fn history(impressions: u64, clicks: u64, cost: f64, conversions: u64, prior_bid: f64) -> PerformanceToDate {
        PerformanceToDate {
            impressions,
            clicks,
            cost,
            conversions,
            revenue: conversions as f64 * 100.0,
            days_elapsed: 5,
            last_day_clicks: clicks / 5,
            last_day_conversions: conversions / 5,
            prior_bid,
            budget_share: 50.0,
        }
    }

    fn all_automated() -> Vec<Box<dyn BidProposerTrait>> {
        vec![
            bidder_for(&BiddingStrategyConfig::TargetCpa { target_cpa: 10.0 }, &settings()),
            bidder_for(&BiddingStrategyConfig::TargetRoas { target_roas: 4.0 }, &settings()),
            bidder_for(&BiddingStrategyConfig::MaximizeConversions { bid_ceiling: 5.0 }, &settings()),
        ]
    }

    #[test]
    fn test_manual_returns_configured_bid() {
        let bidder = bidder_for(&BiddingStrategyConfig::ManualCpc, &settings());
        let decision = bidder.next_bid(2.0, &history(1000, 50, 80.0, 5, 0.3));
        assert_eq!(decision.bid, 2.0);
        assert_eq!(decision.clamped_from, None);
    }

    #[test]
    fn test_zero_impressions_returns_seed() {
        for bidder in all_automated() {
            let decision = bidder.next_bid(1.0, &PerformanceToDate { prior_bid: 1.0, budget_share: 50.0, ..Default::default() });
            assert!(decision.used_seed, "{}", bidder.get_bidding_type());
            assert!(decision.bid.is_finite() && decision.bid > 0.0);
        }
    }

    #[test]
    fn test_target_cpa_cold_start_uses_seed_bid() {
        let bidder = bidder_for(&BiddingStrategyConfig::TargetCpa { target_cpa: 10.0 }, &settings());
        let seed = bidder.seed_bid(1.0);
        assert_relative_eq!(seed, 0.5);
        let after_empty_day = bidder.next_bid(1.0, &history(120, 6, 4.0, 0, seed));
        assert!(after_empty_day.used_seed);
        assert_eq!(after_empty_day.bid, seed);
    }

    #[test]
    fn test_target_cpa_direction() {
        let bidder = bidder_for(&BiddingStrategyConfig::TargetCpa { target_cpa: 10.0 }, &settings());
        // CPA 5 is well under target
        assert!(bidder.next_bid(1.0, &history(1000, 100, 50.0, 10, 1.0)).bid > 1.0);
        // CPA 20 is over target
        assert!(bidder.next_bid(1.0, &history(1000, 100, 200.0, 10, 1.0)).bid < 1.0);
    }

    #[test]
    fn test_target_roas_direction() {
        let bidder = bidder_for(&BiddingStrategyConfig::TargetRoas { target_roas: 4.0 }, &settings());
        // 10 conversions = 1000 revenue; cost 100 gives ROAS 10
        assert!(bidder.next_bid(1.0, &history(1000, 100, 100.0, 10, 1.0)).bid > 1.0);
        // cost 500 gives ROAS 2
        assert!(bidder.next_bid(1.0, &history(1000, 100, 500.0, 10, 1.0)).bid < 1.0);
    }

    #[test]
    fn test_maximize_conversions_respects_ceiling() {
        let bidder = bidder_for(&BiddingStrategyConfig::MaximizeConversions { bid_ceiling: 1.2 }, &settings());
        // 2 clicks a day on a 50 budget: fair share is 25 per click
        let decision = bidder.next_bid(1.0, &history(1000, 10, 10.0, 5, 1.0));
        assert!(decision.bid <= 1.2);
        assert!(decision.bid >= 1.0);
    }

    #[test]
    fn test_maximize_conversions_rises_while_trending_up() {
        let bidder = bidder_for(&BiddingStrategyConfig::MaximizeConversions { bid_ceiling: 5.0 }, &settings());
        // 10% cumulative CVR, 20% yesterday; 10 clicks a day on 50 is a fair share of 5 per click
        let performance = PerformanceToDate { last_day_clicks: 10, last_day_conversions: 2, ..history(1000, 50, 40.0, 5, 2.0) };
        let decision = bidder.next_bid(2.0, &performance);
        assert_relative_eq!(decision.bid, 2.0 + 0.5 * (5.0 - 2.0));
        assert!(decision.bid > performance.prior_bid);
        assert_eq!(decision.clamped_from, None);
    }

    #[test]
    fn test_maximize_conversions_decays_while_trending_down() {
        let bidder = bidder_for(&BiddingStrategyConfig::MaximizeConversions { bid_ceiling: 5.0 }, &settings());
        let performance = PerformanceToDate { last_day_clicks: 10, last_day_conversions: 0, ..history(1000, 50, 40.0, 5, 2.0) };
        let decision = bidder.next_bid(2.0, &performance);
        assert_relative_eq!(decision.bid, 0.9 * 2.0);
        assert_eq!(decision.clamped_from, None);
    }

    #[test]
    fn test_step_bound_holds_for_every_strategy() {
        let priors = [0.05, 0.4, 1.0, 3.0, 12.0];
        let histories = [
            (0, 0, 0.0, 0),
            (500, 20, 1.0, 10),
            (500, 20, 900.0, 3),
            (10_000, 400, 4000.0, 1),
            (10_000, 400, 0.5, 400),
        ];
        for bidder in all_automated() {
            for prior in priors {
                for (impressions, clicks, cost, conversions) in histories {
                    for keyword_bid in [0.01, 1.0, 50.0] {
                        let next = bidder.next_bid(keyword_bid, &history(impressions, clicks, cost, conversions, prior)).bid;
                        assert!(
                            next >= MIN_STEP_FACTOR * prior - 1e-12 && next <= MAX_STEP_FACTOR * prior + 1e-12,
                            "{}: prior {} next {}",
                            bidder.get_bidding_type(),
                            prior,
                            next
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_clamp_is_reported() {
        let bidder = bidder_for(&BiddingStrategyConfig::TargetCpa { target_cpa: 10.0 }, &settings());
        // seed of 0.5 against a prior of 5.0 is more than halving
        let decision = bidder.next_bid(1.0, &PerformanceToDate { prior_bid: 5.0, ..Default::default() });
        assert_eq!(decision.bid, 2.5);
        assert_eq!(decision.clamped_from, Some(0.5));
    }
}
