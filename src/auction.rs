use rand::rngs::StdRng;
use rand::Rng;

use crate::competition::Competitor;
use crate::quality::QualityScore;
use crate::settings::SimulationSettings;

/// Click-through rate by ad position, top slot first
pub const POSITION_CTR: [f64; 4] = [0.080, 0.052, 0.036, 0.026];
pub const POSITION_CTR_BEYOND: f64 = 0.020;

/// Expected CTR for a 1-based position; 0 for not shown
pub fn position_ctr(position: usize) -> f64 {
    match position {
        0 => 0.0,
        p if p <= POSITION_CTR.len() => POSITION_CTR[p - 1],
        _ => POSITION_CTR_BEYOND,
    }
}

/// Result of ranking the advertiser against one round's competitors
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionRound {
    pub bid: f64,
    pub ad_rank: f64,
    /// Competitor ad ranks, highest first
    pub competitor_ranks: Vec<f64>,
    /// 1-based, 0 when not shown
    pub position: usize,
    /// Price charged if the ad is clicked; 0 when not shown
    pub cpc: f64,
    /// Second price before capping at the bid
    pub uncapped_cpc: f64,
}

impl AuctionRound {
    fn not_shown(bid: f64, competitor_ranks: Vec<f64>) -> Self {
        Self { bid, ad_rank: 0.0, competitor_ranks, position: 0, cpc: 0.0, uncapped_cpc: 0.0 }
    }

    pub fn is_shown(&self) -> bool {
        self.position > 0
    }

    /// The second price was above the bid and the bid was charged instead
    pub fn cpc_capped(&self) -> bool {
        self.uncapped_cpc > self.cpc
    }
}

/// What the user did with the ad
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Outcome {
    pub clicked: bool,
    pub converted: bool,
    /// Click probability the draw was compared against
    pub expected_ctr: f64,
}

/// Generalized second price auction
pub struct AuctionResolver {
    max_slots: usize,
    currency_increment: f64,
    reserve_cpc: f64,
}

impl AuctionResolver {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            max_slots: settings.max_slots,
            currency_increment: settings.currency_increment,
            reserve_cpc: settings.reserve_cpc,
        }
    }

    /// Rank the advertiser among the competitors. Ties go to the advertiser.
    /// A non-positive or non-finite bid means the advertiser sits the round out.
    pub fn run(&self, bid: f64, quality: QualityScore, competitors: &[Competitor]) -> AuctionRound {
        let mut competitor_ranks: Vec<f64> = competitors.iter().map(|c| c.ad_rank()).filter(|r| r.is_finite()).collect();
        competitor_ranks.sort_by(|a, b| b.total_cmp(a));

        let quality = quality.value();
        if !bid.is_finite() || bid <= 0.0 || !(quality > 0.0) {
            return AuctionRound::not_shown(bid, competitor_ranks);
        }

        let ad_rank = bid * quality;
        let above = competitor_ranks.iter().filter(|r| **r > ad_rank).count();
        let position = above + 1;
        if position > self.max_slots {
            return AuctionRound { ad_rank, ..AuctionRound::not_shown(bid, competitor_ranks) };
        }

        // Highest rank not above ours is the one we have to stay ahead of
        let uncapped_cpc = match competitor_ranks.get(above) {
            Some(next_rank) => next_rank / quality + self.currency_increment,
            None => self.reserve_cpc,
        };
        let cpc = uncapped_cpc.min(bid);

        if !cpc.is_finite() {
            return AuctionRound { ad_rank, ..AuctionRound::not_shown(bid, competitor_ranks) };
        }

        AuctionRound { bid, ad_rank, competitor_ranks, position, cpc, uncapped_cpc }
    }
}

/// Deterministic click and conversion draws for a resolved round. Always
/// consumes exactly two draws from `rng`, shown or not, so the draw sequence
/// does not depend on the outcome. `ctr_factor` combines device and ad
/// extension multipliers.
pub fn resolve_outcome(round: &AuctionRound, quality: QualityScore, ctr_factor: f64, conversion_rate: f64, rng: &mut StdRng) -> Outcome {
    let click_draw: f64 = rng.gen();
    let conversion_draw: f64 = rng.gen();
    if !round.is_shown() {
        return Outcome::default();
    }

    let expected_ctr = (position_ctr(round.position) * quality.relevance_scale() * ctr_factor).clamp(0.0, 1.0);
    let clicked = click_draw < expected_ctr;
    let converted = clicked && conversion_draw < conversion_rate.clamp(0.0, 1.0);
    Outcome { clicked, converted, expected_ctr }
}
