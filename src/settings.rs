use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pacing::PacingMode;

/// Engine tuning knobs. Everything that shapes the marketplace but is not part
/// of what an advertiser configures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Ads shown per results page
    pub max_slots: usize,
    /// Smallest currency step added on top of the next rank's price
    pub currency_increment: f64,
    /// Price paid when nobody ranks below the advertiser
    pub reserve_cpc: f64,
    /// Auction rounds per keyword-day when no search volume is known
    pub default_rounds_per_day: u32,
    /// Upper bound on rounds per keyword-day, whatever the search volume
    pub max_rounds_per_day: u32,
    pub competitor_pool: usize,
    pub competitor_strength_floor: f64,
    pub competitor_strength_ceiling: f64,
    /// Length K of the cyclical competitor bid pattern
    pub competitor_cycle: usize,
    /// Feed observed CTR from earlier days back into the quality score
    pub ctr_feedback: bool,
    pub value_per_conversion: f64,
    pub base_conversion_rate: f64,
    /// Conversions needed before automated strategies trust observed data
    pub min_conversions: u64,
    /// Cap on simulated days a single run may cover
    pub max_days: u32,
    pub pacing_mode: PacingMode,
    /// Under this budget-ratio / time-ratio a constrained round is skipped outright
    pub pacing_skip_threshold: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            max_slots: 4,
            currency_increment: 0.01,
            reserve_cpc: 0.01,
            default_rounds_per_day: 300,
            max_rounds_per_day: 1000,
            competitor_pool: 10,
            competitor_strength_floor: 0.3,
            competitor_strength_ceiling: 1.0,
            competitor_cycle: 8,
            ctr_feedback: true,
            value_per_conversion: 100.0,
            base_conversion_rate: 0.05,
            min_conversions: 3,
            max_days: 366,
            pacing_mode: PacingMode::Standard,
            pacing_skip_threshold: 0.5,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_slots == 0 {
            return Err(ConfigError::InvalidSettings("max_slots must be at least 1".to_string()));
        }
        if !(self.currency_increment > 0.0) || !(self.reserve_cpc > 0.0) {
            return Err(ConfigError::InvalidSettings("currency increment and reserve cpc must be positive".to_string()));
        }
        if self.max_rounds_per_day == 0 || self.default_rounds_per_day == 0 {
            return Err(ConfigError::InvalidSettings("rounds per day must be at least 1".to_string()));
        }
        if self.competitor_pool == 0 || self.competitor_cycle == 0 {
            return Err(ConfigError::InvalidSettings("competitor pool and cycle must be at least 1".to_string()));
        }
        if !(0.0..=self.competitor_strength_ceiling).contains(&self.competitor_strength_floor) {
            return Err(ConfigError::InvalidSettings(format!(
                "competitor strength floor {} must lie in [0, ceiling {}]",
                self.competitor_strength_floor, self.competitor_strength_ceiling
            )));
        }
        if !(0.0..=1.0).contains(&self.base_conversion_rate) {
            return Err(ConfigError::InvalidSettings(format!("base conversion rate {} outside [0, 1]", self.base_conversion_rate)));
        }
        if !(self.value_per_conversion >= 0.0) {
            return Err(ConfigError::InvalidSettings("value per conversion must not be negative".to_string()));
        }
        if self.max_days == 0 {
            return Err(ConfigError::InvalidSettings("max_days must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.pacing_skip_threshold) {
            return Err(ConfigError::InvalidSettings(format!("pacing skip threshold {} outside [0, 1]", self.pacing_skip_threshold)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(SimulationSettings::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_slots() {
        let settings = SimulationSettings { max_slots: 0, ..Default::default() };
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidSettings(_))));
    }

    #[test]
    fn test_rejects_floor_above_ceiling() {
        let settings = SimulationSettings { competitor_strength_floor: 1.2, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: SimulationSettings = serde_json::from_str(r#"{ "max_slots": 3, "ctr_feedback": false }"#).unwrap();
        assert_eq!(settings.max_slots, 3);
        assert!(!settings.ctr_feedback);
        assert_eq!(settings.competitor_pool, 10);
    }
}
