use serde::{Deserialize, Serialize};

use crate::settings::SimulationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Spread spend evenly over the day
    Standard,
    /// Spend as fast as the auction allows until the budget is gone
    Accelerated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingPhase {
    /// Start of day, nothing spent yet
    Fresh,
    /// Spend at or behind linear pace
    Pacing,
    /// Spend ahead of linear pace; bids scaled down, rounds may be skipped
    Constrained,
    /// Budget consumed; no more rounds today
    Exhausted,
}

/// Per-day pacing state, reset at every day boundary
#[derive(Debug, Clone, PartialEq)]
pub struct PacingState {
    pub budget_total: f64,
    pub budget_remaining: f64,
    pub elapsed_fraction: f64,
    pub multiplier: f64,
    pub phase: PacingPhase,
}

impl PacingState {
    fn fresh(budget_total: f64) -> Self {
        Self {
            budget_total,
            budget_remaining: budget_total,
            elapsed_fraction: 0.0,
            multiplier: 1.0,
            phase: PacingPhase::Fresh,
        }
    }

    pub fn spent(&self) -> f64 {
        self.budget_total - self.budget_remaining
    }
}

/// Throttle decision for one round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throttle {
    pub effective_bid: f64,
    /// Paced bid before capping at the remaining budget
    pub uncapped_bid: f64,
    pub participate: bool,
}

impl Throttle {
    fn sit_out() -> Self {
        Self { effective_bid: 0.0, uncapped_bid: 0.0, participate: false }
    }

    /// The remaining budget, not pacing, set the effective bid
    pub fn budget_capped(&self) -> bool {
        self.participate && self.uncapped_bid > self.effective_bid
    }
}

/// Keeps a day's spend in line with the daily budget. Only ever lowers bids.
pub struct PacingController {
    mode: PacingMode,
    skip_threshold: f64,
    /// Remaining budget at or below this counts as exhausted
    exhaustion_floor: f64,
    state: PacingState,
}

impl PacingController {
    pub fn new(daily_budget: f64, settings: &SimulationSettings) -> Self {
        Self {
            mode: settings.pacing_mode,
            skip_threshold: settings.pacing_skip_threshold,
            exhaustion_floor: settings.currency_increment,
            state: PacingState::fresh(daily_budget),
        }
    }

    /// Day boundary: full budget again
    pub fn start_day(&mut self) {
        self.state = PacingState::fresh(self.state.budget_total);
    }

    pub fn state(&self) -> &PacingState {
        &self.state
    }

    /// Decide how (and whether) to bid in the next round. `elapsed_fraction` is
    /// the share of today's rounds already resolved.
    pub fn throttle(&mut self, proposed_bid: f64, elapsed_fraction: f64) -> Throttle {
        if self.state.phase == PacingPhase::Exhausted {
            return Throttle::sit_out();
        }
        if self.state.budget_remaining <= self.exhaustion_floor {
            self.state.phase = PacingPhase::Exhausted;
            return Throttle::sit_out();
        }
        self.state.elapsed_fraction = elapsed_fraction.clamp(0.0, 1.0);

        let pace_ratio = match self.mode {
            PacingMode::Accelerated => 1.0,
            PacingMode::Standard => {
                let time_remaining = 1.0 - self.state.elapsed_fraction;
                if time_remaining <= 0.0 || self.state.budget_total <= 0.0 {
                    1.0
                } else {
                    (self.state.budget_remaining / self.state.budget_total) / time_remaining
                }
            }
        };

        if pace_ratio < 1.0 {
            self.state.phase = PacingPhase::Constrained;
            self.state.multiplier = pace_ratio;
            if pace_ratio < self.skip_threshold {
                return Throttle::sit_out();
            }
        } else {
            self.state.phase = PacingPhase::Pacing;
            self.state.multiplier = 1.0;
        }

        let uncapped_bid = (proposed_bid * self.state.multiplier).min(proposed_bid);
        let effective_bid = uncapped_bid.min(self.state.budget_remaining);
        Throttle { effective_bid, uncapped_bid, participate: effective_bid > 0.0 }
    }

    /// Charge a click against today's budget
    pub fn record_spend(&mut self, cost: f64) {
        if cost > 0.0 {
            self.state.budget_remaining = (self.state.budget_remaining - cost).max(0.0);
        }
        if self.state.budget_remaining <= self.exhaustion_floor {
            self.state.phase = PacingPhase::Exhausted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn controller(budget: f64, mode: PacingMode) -> PacingController {
        let settings = SimulationSettings { pacing_mode: mode, ..Default::default() };
        PacingController::new(budget, &settings)
    }

    #[test]
    fn test_fresh_to_pacing_on_first_round() {
        let mut pacing = controller(10.0, PacingMode::Standard);
        assert_eq!(pacing.state().phase, PacingPhase::Fresh);
        let throttle = pacing.throttle(1.5, 0.0);
        assert_eq!(pacing.state().phase, PacingPhase::Pacing);
        assert_eq!(throttle, Throttle { effective_bid: 1.5, uncapped_bid: 1.5, participate: true });
        assert!(!throttle.budget_capped());
    }

    #[test]
    fn test_ahead_of_pace_becomes_constrained() {
        let mut pacing = controller(10.0, PacingMode::Standard);
        pacing.throttle(1.0, 0.0);
        pacing.record_spend(3.0);
        // 70% of budget left with 80% of the day to go
        let throttle = pacing.throttle(1.0, 0.2);
        assert_eq!(pacing.state().phase, PacingPhase::Constrained);
        assert_relative_eq!(throttle.effective_bid, 0.875);
        assert!(throttle.participate);

        // back on pace later in the day
        pacing.throttle(1.0, 0.5);
        assert_eq!(pacing.state().phase, PacingPhase::Pacing);
    }

    #[test]
    fn test_far_ahead_of_pace_skips() {
        let mut pacing = controller(10.0, PacingMode::Standard);
        pacing.throttle(1.0, 0.0);
        pacing.record_spend(8.0);
        let throttle = pacing.throttle(1.0, 0.1);
        assert_eq!(pacing.state().phase, PacingPhase::Constrained);
        assert!(!throttle.participate);
    }

    #[test]
    fn test_exhausted_until_next_day() {
        let mut pacing = controller(5.0, PacingMode::Accelerated);
        pacing.throttle(2.0, 0.0);
        pacing.record_spend(4.995);
        assert_eq!(pacing.state().phase, PacingPhase::Exhausted);
        assert!(!pacing.throttle(2.0, 0.1).participate);
        assert!(!pacing.throttle(2.0, 0.9).participate);

        pacing.start_day();
        assert_eq!(pacing.state().phase, PacingPhase::Fresh);
        assert_eq!(pacing.state().budget_remaining, 5.0);
        assert!(pacing.throttle(2.0, 0.0).participate);
    }

    #[test]
    fn test_never_raises_bid_and_caps_at_remaining() {
        let mut pacing = controller(5.0, PacingMode::Accelerated);
        pacing.throttle(1.0, 0.0);
        pacing.record_spend(4.5);
        let throttle = pacing.throttle(3.0, 0.3);
        assert_relative_eq!(throttle.effective_bid, 0.5);
        assert_relative_eq!(throttle.uncapped_bid, 3.0);
        assert!(throttle.budget_capped());
        for (bid, elapsed) in [(0.2, 0.4), (7.0, 0.5), (0.0, 0.6)] {
            assert!(pacing.throttle(bid, elapsed).effective_bid <= bid);
        }
    }

    #[test]
    fn test_remaining_is_non_increasing() {
        let mut pacing = controller(5.0, PacingMode::Standard);
        let mut last = pacing.state().budget_remaining;
        for cost in [0.5, 0.0, -1.0, 1.2, 10.0] {
            pacing.record_spend(cost);
            assert!(pacing.state().budget_remaining <= last);
            last = pacing.state().budget_remaining;
        }
        assert_eq!(last, 0.0);
    }
}
