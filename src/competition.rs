//! Synthetic competitor field for a keyword.
//!
//! Everything that does not change between rounds (market price level, how many
//! advertisers show up, how strong each of them is) is fixed per keyword when the
//! market is built. Per round only the cyclical bid pattern, the hour of day and a
//! small seeded jitter move the ladder around.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, LogNormal};

use crate::campaign::Keyword;
use crate::matching::{intent_score, query_complexity};
use crate::seed::{KeywordKey, RunSeed};
use crate::settings::SimulationSettings;

/// Share of daily searches per hour of day. Unnormalized, peaks late morning and early evening.
pub const HOURLY_DISTRIBUTION: [f64; 24] = [
    0.02, 0.01, 0.01, 0.01, 0.02, 0.03, // 0-5
    0.04, 0.05, 0.06, 0.07, 0.08, 0.08, // 6-11
    0.07, 0.07, 0.06, 0.06, 0.07, 0.08, // 12-17
    0.07, 0.06, 0.05, 0.04, 0.03, 0.02, // 18-23
];

const DEFAULT_COMPETITION_INDEX: f64 = 0.65;
const MAX_PRESENCE: f64 = 0.95;
const MARKET_CPC_MEAN: f64 = 1.5;
const MARKET_CPC_STDDEV: f64 = 0.6;
/// Amplitude of the cyclical bid pattern
const CYCLE_AMPLITUDE: f64 = 0.12;
/// Amplitude of the per-round jitter on top of the cycle
const ROUND_JITTER: f64 = 0.05;

/// One rival advertiser in one round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Competitor {
    pub bid: f64,
    pub quality: f64,
}

impl Competitor {
    pub fn ad_rank(&self) -> f64 {
        self.bid * self.quality
    }
}

/// Convert mean and standard deviation into LogNormal(μ, σ) parameters
/// - σ = sqrt(ln(1 + s²/m²))
/// - μ = ln(m) - σ²/2
fn lognormal_from_mean_stddev(mean: f64, stddev: f64) -> (f64, f64) {
    let sigma_squared = (1.0 + (stddev * stddev) / (mean * mean)).ln();
    (mean.ln() - sigma_squared / 2.0, sigma_squared.sqrt())
}

/// Hour of day for the `round`-th of `rounds` evenly spread rounds, following
/// the hourly search distribution
pub fn hour_for_round(round: u32, rounds: u32) -> u8 {
    let total: f64 = HOURLY_DISTRIBUTION.iter().sum();
    let position = (round as f64 + 0.5) / rounds.max(1) as f64 * total;
    let mut cumulative = 0.0_f64;
    for (hour, share) in HOURLY_DISTRIBUTION.iter().enumerate() {
        cumulative += *share;
        if position < cumulative {
            return hour as u8;
        }
    }
    23
}

/// Bid multiplier for the hour; busy hours bring more aggressive bidding
pub fn hour_multiplier(hour: u8) -> f64 {
    0.9 + HOURLY_DISTRIBUTION[(hour as usize) % 24] * 2.0
}

/// Multiplier of the cyclical bid pattern for a slot of a K-long cycle
fn cycle_multiplier(slot: usize, cycle: usize) -> f64 {
    1.0 + CYCLE_AMPLITUDE * (2.0 * std::f64::consts::PI * slot as f64 / cycle as f64).sin()
}

/// The trough of the cycle, where one advertiser sits out
fn is_thin_slot(slot: usize, cycle: usize) -> bool {
    cycle_multiplier(slot, cycle) < 1.0 - CYCLE_AMPLITUDE / 2.0
}

/// Competitor market for one keyword over the whole run
#[derive(Debug, Clone)]
pub struct KeywordMarket {
    pub market_cpc: f64,
    pub presence: f64,
    pub intent: f64,
    /// Competitors on a regular slot of the cycle
    pub base_count: usize,
    cycle: usize,
    /// Strongest last
    strengths: Vec<f64>,
    qualities: Vec<f64>,
}

impl KeywordMarket {
    pub fn new(keyword: &Keyword, key: &KeywordKey, seed: &RunSeed, settings: &SimulationSettings) -> Self {
        let metrics = keyword.metrics.clone().unwrap_or_default();

        let intent = intent_score(&keyword.text);
        let competition_index = metrics.competition_index.unwrap_or(DEFAULT_COMPETITION_INDEX).clamp(0.0, 1.0);
        let presence = (competition_index * intent * query_complexity(&keyword.text)).min(MAX_PRESENCE);
        let base_count = ((settings.competitor_pool as f64 * presence).round() as usize).max(1);

        let market_cpc = match metrics.suggested_bid {
            Some(bid) if bid.is_finite() && bid > 0.0 => bid,
            _ => {
                let (mu, sigma) = lognormal_from_mean_stddev(MARKET_CPC_MEAN, MARKET_CPC_STDDEV);
                match LogNormal::new(mu, sigma) {
                    Ok(dist) => dist.sample(&mut seed.keyword_rng(key)),
                    Err(_) => MARKET_CPC_MEAN,
                }
            }
        };

        let strengths: Vec<f64> = (0..base_count)
            .map(|i| strength_fraction(i, base_count, settings.competitor_strength_floor, settings.competitor_strength_ceiling))
            .collect();
        let qualities = strengths
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let offset: f64 = seed.competitor_rng(key, i).gen_range(-1.0..1.0);
                (3.0 + 7.0 * s + offset).clamp(1.0, 10.0)
            })
            .collect();

        Self {
            market_cpc,
            presence,
            intent,
            base_count,
            cycle: settings.competitor_cycle.max(1),
            strengths,
            qualities,
        }
    }

    /// Competitors present in the round at `round_index`
    pub fn competitor_count(&self, round_index: u64) -> usize {
        let slot = (round_index % self.cycle as u64) as usize;
        if is_thin_slot(slot, self.cycle) && self.base_count > 1 {
            self.base_count - 1
        } else {
            self.base_count
        }
    }

    /// Competitor ladder for one round. `rng` is the round generator; this
    /// consumes a fixed number of draws so later draws from it line up.
    pub fn generate(&self, round_index: u64, hour: u8, rng: &mut StdRng) -> Vec<Competitor> {
        let slot = (round_index % self.cycle as u64) as usize;
        let count = self.competitor_count(round_index);
        // thin slots drop the weakest advertiser
        let skip = self.base_count - count;
        let intent_multiplier = 0.8 + self.intent * 0.4;
        let pattern = cycle_multiplier(slot, self.cycle) * hour_multiplier(hour) * intent_multiplier;

        let mut competitors = Vec::with_capacity(count);
        for i in 0..self.base_count {
            let jitter = 1.0 + ROUND_JITTER * rng.gen_range(-1.0..1.0);
            if i < skip {
                continue;
            }
            competitors.push(Competitor {
                bid: self.market_cpc * (0.5 + self.strengths[i]) * pattern * jitter,
                quality: self.qualities[i],
            });
        }
        competitors
    }
}

/// Strength of competitor `i` of `n`, evenly spread between floor and ceiling
pub fn strength_fraction(i: usize, n: usize, floor: f64, ceiling: f64) -> f64 {
    if n <= 1 {
        return floor + 0.5 * (ceiling - floor);
    }
    floor + (i as f64 / (n - 1) as f64) * (ceiling - floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{AdGroup, BiddingStrategyConfig, CampaignConfig, KeywordMetrics, MatchType};
    use crate::seed::SeedScheme;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn market_for(keyword: Keyword) -> (KeywordMarket, RunSeed, KeywordKey) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let ad_group = AdGroup::new("Group", 1.0, vec![keyword.clone()]);
        let config = CampaignConfig::new("Test", start, start, 10.0, BiddingStrategyConfig::ManualCpc).with_ad_group(ad_group.clone());
        let seed = RunSeed::derive(SeedScheme::V1, &config);
        let key = KeywordKey::new(&ad_group, &keyword);
        (KeywordMarket::new(&keyword, &key, &seed, &SimulationSettings::default()), seed, key)
    }

    #[test]
    fn test_strength_fraction_single_competitor_is_midpoint() {
        assert_relative_eq!(strength_fraction(0, 1, 0.3, 1.0), 0.65);
        assert_relative_eq!(strength_fraction(0, 5, 0.3, 1.0), 0.3);
        assert_relative_eq!(strength_fraction(4, 5, 0.3, 1.0), 1.0);
    }

    #[test]
    fn test_generate_is_reproducible() {
        let (market, seed, key) = market_for(Keyword::new("buy running shoes online", MatchType::Phrase));
        let a = market.generate(17, 10, &mut seed.round_rng(&key, 17));
        let b = market.generate(17, 10, &mut seed.round_rng(&key, 17));
        assert_eq!(a, b);
        assert_eq!(a.len(), market.competitor_count(17));
    }

    #[test]
    fn test_presence_scales_with_intent() {
        let (informational, _, _) = market_for(Keyword::new("why shoes", MatchType::Broad));
        let (commercial, _, _) = market_for(Keyword::new("buy shoes", MatchType::Broad));
        assert!(commercial.base_count > informational.base_count);
        assert!(informational.base_count >= 1);
    }

    #[test]
    fn test_thin_slots_never_empty() {
        let (market, seed, key) = market_for(Keyword::new("why", MatchType::Broad));
        for round in 0..16 {
            assert!(!market.generate(round, 3, &mut seed.round_rng(&key, round)).is_empty());
        }
    }

    #[test]
    fn test_suggested_bid_sets_market_price() {
        let keyword = Keyword::new("running shoes", MatchType::Exact)
            .with_metrics(KeywordMetrics { suggested_bid: Some(3.25), ..Default::default() });
        let (market, _, _) = market_for(keyword);
        assert_eq!(market.market_cpc, 3.25);
    }

    #[test]
    fn test_competitor_quality_in_bounds() {
        let keyword = Keyword::new("buy cheap running shoes sale", MatchType::Exact)
            .with_metrics(KeywordMetrics { competition_index: Some(1.0), ..Default::default() });
        let (market, seed, key) = market_for(keyword);
        for c in market.generate(0, 12, &mut seed.round_rng(&key, 0)) {
            assert!((1.0..=10.0).contains(&c.quality));
            assert!(c.bid > 0.0);
        }
    }

    #[test]
    fn test_hour_for_round_covers_day_in_order() {
        let hours: Vec<u8> = (0..240).map(|r| hour_for_round(r, 240)).collect();
        assert_eq!(hours[0], 0);
        assert_eq!(*hours.last().unwrap(), 23);
        assert!(hours.windows(2).all(|w| w[0] <= w[1]));
    }
}
