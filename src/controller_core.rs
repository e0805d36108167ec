/// Which side of the target calls for a higher bid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaiseWhen {
    /// Cost-like metrics (CPA): coming in under target leaves room to bid up
    BelowTarget,
    /// Return-like metrics (ROAS): beating the target leaves room to bid up
    AboveTarget,
}

/// Proportional controller stepping a bid towards a performance target.
/// Full PID was tried, but always something became unstable
pub struct ControllerProportionalCore {
    tolerance_fraction: f64,      // Tolerance as a fraction of target (e.g., 0.02 = 2%)
    max_adjustment_factor: f64,   // Largest single step as a fraction of the previous bid
    proportional_gain: f64,       // Share of the relative error applied per step
}

impl ControllerProportionalCore {
    pub fn new() -> Self {
        Self {
            tolerance_fraction: 0.02,
            max_adjustment_factor: 0.5,
            proportional_gain: 0.5,
        }
    }

    /// Next bid given a target and the observed value of the controlled metric
    ///
    /// # Returns
    /// A tuple `(changed, next_bid)` where `changed` is false when the observation
    /// is within tolerance of the target
    pub fn controller_next_state(&self, target: f64, actual: f64, previous_bid: f64, raise_when: RaiseWhen) -> (bool, f64) {
        if !(target > 0.0) || !actual.is_finite() {
            return (false, previous_bid);
        }
        let tolerance = target * self.tolerance_fraction;
        let error_ratio = ((actual - target) / target).abs();
        let adjustment = (error_ratio * self.proportional_gain).min(self.max_adjustment_factor);

        let below = actual < target - tolerance;
        let above = actual > target + tolerance;
        let change = match (raise_when, below, above) {
            (RaiseWhen::BelowTarget, true, _) | (RaiseWhen::AboveTarget, _, true) => previous_bid * adjustment,
            (RaiseWhen::BelowTarget, _, true) | (RaiseWhen::AboveTarget, true, _) => -previous_bid * adjustment,
            _ => 0.0,
        };

        (change != 0.0, previous_bid + change)
    }
}

impl Default for ControllerProportionalCore {
    fn default() -> Self {
        Self::new()
    }
}
