//! Campaign configuration as handed over by the form / wizard layer.
//! Everything here is read-only to the simulation; mutable per-keyword
//! counters live in `simulation::SimulationState`.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::extensions::AdExtension;
use crate::seasonality::Industry;
use crate::settings::SimulationSettings;

/// Keyword match type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Phrase,
    Broad,
}

impl MatchType {
    /// How well traffic matched by this type tends to click, used as the
    /// match component of the expected-CTR proxy
    pub fn ctr_baseline(&self) -> f64 {
        match self {
            MatchType::Exact => 0.95,
            MatchType::Phrase => 0.70,
            MatchType::Broad => 0.40,
        }
    }

    /// Looser matches bring in less qualified traffic
    pub fn conversion_factor(&self) -> f64 {
        match self {
            MatchType::Exact => 1.0,
            MatchType::Phrase => 0.9,
            MatchType::Broad => 0.75,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Phrase => "phrase",
            MatchType::Broad => "broad",
        }
    }
}

/// Externally sourced keyword metrics (keyword planner / ads API).
/// Resolved once before the run; only ever used as static inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordMetrics {
    #[serde(default)]
    pub daily_searches: Option<f64>,
    /// 0.0 - 1.0
    #[serde(default)]
    pub competition_index: Option<f64>,
    #[serde(default)]
    pub suggested_bid: Option<f64>,
    #[serde(default)]
    pub conversion_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub match_type: MatchType,
    /// Manual max CPC; falls back to the ad group default when absent
    #[serde(default)]
    pub max_bid: Option<f64>,
    #[serde(default)]
    pub metrics: Option<KeywordMetrics>,
}

impl Keyword {
    pub fn new(text: &str, match_type: MatchType) -> Self {
        Self {
            text: text.to_string(),
            match_type,
            max_bid: None,
            metrics: None,
        }
    }

    pub fn with_max_bid(mut self, max_bid: f64) -> Self {
        self.max_bid = Some(max_bid);
        self
    }

    pub fn with_metrics(mut self, metrics: KeywordMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Keyword-level bid, or the ad group default
    pub fn effective_bid(&self, ad_group_default: f64) -> f64 {
        self.max_bid.unwrap_or(ad_group_default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdGroup {
    pub name: String,
    pub keywords: Vec<Keyword>,
    pub default_bid: f64,
    /// Ad headlines; feed the ad relevance signal together with the group name
    #[serde(default)]
    pub headlines: Vec<String>,
    #[serde(default)]
    pub final_url: Option<String>,
    #[serde(default)]
    pub negative_keywords: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<AdExtension>,
}

impl AdGroup {
    pub fn new(name: &str, default_bid: f64, keywords: Vec<Keyword>) -> Self {
        Self {
            name: name.to_string(),
            keywords,
            default_bid,
            headlines: Vec::new(),
            final_url: None,
            negative_keywords: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn with_headlines(mut self, headlines: &[&str]) -> Self {
        self.headlines = headlines.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn with_final_url(mut self, url: &str) -> Self {
        self.final_url = Some(url.to_string());
        self
    }

    pub fn with_negative_keywords(mut self, negatives: &[&str]) -> Self {
        self.negative_keywords = negatives.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<AdExtension>) -> Self {
        self.extensions = extensions;
        self
    }
}

/// Bidding strategy selection with its target parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BiddingStrategyConfig {
    ManualCpc,
    TargetCpa { target_cpa: f64 },
    TargetRoas { target_roas: f64 },
    MaximizeConversions { bid_ceiling: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Desktop,
    Mobile,
    Tablet,
}

impl Device {
    /// Traffic split: 7 desktop, 2 mobile, 1 tablet out of every 10 rounds
    pub fn for_round(round_in_day: u32) -> Device {
        match round_in_day % 10 {
            0..=6 => Device::Desktop,
            7 | 8 => Device::Mobile,
            _ => Device::Tablet,
        }
    }

    pub fn ctr_factor(&self) -> f64 {
        match self {
            Device::Desktop => 1.0,
            Device::Mobile => 0.85,
            Device::Tablet => 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBidAdjustments {
    pub desktop: f64,
    pub mobile: f64,
    pub tablet: f64,
}

impl Default for DeviceBidAdjustments {
    fn default() -> Self {
        Self { desktop: 1.0, mobile: 1.0, tablet: 1.0 }
    }
}

impl DeviceBidAdjustments {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (device, value) in [("desktop", self.desktop), ("mobile", self.mobile), ("tablet", self.tablet)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDeviceAdjustment { device, value });
            }
        }
        Ok(())
    }

    pub fn for_device(&self, device: Device) -> f64 {
        match device {
            Device::Desktop => self.desktop,
            Device::Mobile => self.mobile,
            Device::Tablet => self.tablet,
        }
    }
}

fn all_hours() -> Vec<u8> {
    (0..24).collect()
}

/// Dayparting: active hours per weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdSchedule {
    #[serde(default = "all_hours")]
    pub monday: Vec<u8>,
    #[serde(default = "all_hours")]
    pub tuesday: Vec<u8>,
    #[serde(default = "all_hours")]
    pub wednesday: Vec<u8>,
    #[serde(default = "all_hours")]
    pub thursday: Vec<u8>,
    #[serde(default = "all_hours")]
    pub friday: Vec<u8>,
    #[serde(default = "all_hours")]
    pub saturday: Vec<u8>,
    #[serde(default = "all_hours")]
    pub sunday: Vec<u8>,
}

impl Default for AdSchedule {
    fn default() -> Self {
        Self {
            monday: all_hours(),
            tuesday: all_hours(),
            wednesday: all_hours(),
            thursday: all_hours(),
            friday: all_hours(),
            saturday: all_hours(),
            sunday: all_hours(),
        }
    }
}

impl AdSchedule {
    /// Business hours on weekdays, dark on weekends
    pub fn business_hours() -> Self {
        let hours: Vec<u8> = (9..18).collect();
        Self {
            monday: hours.clone(),
            tuesday: hours.clone(),
            wednesday: hours.clone(),
            thursday: hours.clone(),
            friday: hours,
            saturday: Vec::new(),
            sunday: Vec::new(),
        }
    }

    /// `weekday` is 0 = Monday .. 6 = Sunday
    pub fn is_active(&self, weekday: u32, hour: u8) -> bool {
        let hours = match weekday {
            0 => &self.monday,
            1 => &self.tuesday,
            2 => &self.wednesday,
            3 => &self.thursday,
            4 => &self.friday,
            5 => &self.saturday,
            6 => &self.sunday,
            _ => return true,
        };
        hours.contains(&hour)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Targeting {
    /// Campaign-level negatives: `"phrase"`, `[exact]` or bare broad terms
    #[serde(default)]
    pub negative_keywords: Vec<String>,
    #[serde(default)]
    pub schedule: Option<AdSchedule>,
    #[serde(default)]
    pub device_bid_adjustments: DeviceBidAdjustments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub name: String,
    pub start_date: NaiveDate,
    /// Inclusive
    pub end_date: NaiveDate,
    pub daily_budget: f64,
    pub strategy: BiddingStrategyConfig,
    pub ad_groups: Vec<AdGroup>,
    #[serde(default)]
    pub targeting: Targeting,
    /// Landing page used when an ad group does not set its own
    #[serde(default)]
    pub final_url: Option<String>,
    /// Drives weekday, month and holiday search volume
    #[serde(default)]
    pub industry: Industry,
}

impl CampaignConfig {
    pub fn new(name: &str, start_date: NaiveDate, end_date: NaiveDate, daily_budget: f64, strategy: BiddingStrategyConfig) -> Self {
        Self {
            name: name.to_string(),
            start_date,
            end_date,
            daily_budget,
            strategy,
            ad_groups: Vec::new(),
            targeting: Targeting::default(),
            final_url: None,
            industry: Industry::default(),
        }
    }

    pub fn with_ad_group(mut self, ad_group: AdGroup) -> Self {
        self.ad_groups.push(ad_group);
        self
    }

    pub fn with_targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    pub fn with_final_url(mut self, url: &str) -> Self {
        self.final_url = Some(url.to_string());
        self
    }

    pub fn with_industry(mut self, industry: Industry) -> Self {
        self.industry = industry;
        self
    }

    /// Search volume of the day relative to an ordinary one
    pub fn volume_multiplier_for_day(&self, day_index: u32) -> f64 {
        self.industry.volume_multiplier(self.date_for_day(day_index))
    }

    /// Number of simulated days, end date inclusive. Zero for an inverted range.
    pub fn num_days(&self) -> u32 {
        let span = (self.end_date - self.start_date).num_days();
        if span < 0 {
            0
        } else {
            (span + 1) as u32
        }
    }

    pub fn date_for_day(&self, day_index: u32) -> NaiveDate {
        self.start_date + Duration::days(day_index as i64)
    }

    /// 0 = Monday .. 6 = Sunday
    pub fn weekday_for_day(&self, day_index: u32) -> u32 {
        self.date_for_day(day_index).weekday().num_days_from_monday()
    }

    pub fn keyword_count(&self) -> usize {
        self.ad_groups.iter().map(|ag| ag.keywords.len()).sum()
    }

    /// Reject anything the simulation cannot run on. No partial runs.
    pub fn validate(&self, settings: &SimulationSettings) -> Result<(), ConfigError> {
        settings.validate()?;

        if self.keyword_count() == 0 {
            return Err(ConfigError::NoKeywords(self.name.clone()));
        }
        if let Some(empty) = self.ad_groups.iter().find(|ag| ag.keywords.is_empty()) {
            return Err(ConfigError::EmptyAdGroup(empty.name.clone()));
        }
        if !(self.daily_budget > 0.0) || !self.daily_budget.is_finite() {
            return Err(ConfigError::NonPositiveBudget(self.daily_budget));
        }
        if self.start_date > self.end_date {
            return Err(ConfigError::InvertedDateRange { start: self.start_date, end: self.end_date });
        }
        let days = self.num_days();
        if days > settings.max_days {
            return Err(ConfigError::DateRangeTooLong { days, max_days: settings.max_days });
        }

        for ad_group in &self.ad_groups {
            for keyword in &ad_group.keywords {
                let bid = keyword.effective_bid(ad_group.default_bid);
                if !bid.is_finite() || bid < 0.0 {
                    return Err(ConfigError::InvalidBid { keyword: keyword.text.clone(), bid });
                }
            }
            for ext in &ad_group.extensions {
                if !(0.0..=1.0).contains(&ext.quality) {
                    return Err(ConfigError::InvalidExtension {
                        ad_group: ad_group.name.clone(),
                        text: ext.text.clone(),
                        quality: ext.quality,
                    });
                }
            }
        }

        self.targeting.device_bid_adjustments.validate()?;

        match self.strategy {
            BiddingStrategyConfig::ManualCpc => {}
            BiddingStrategyConfig::TargetCpa { target_cpa } => {
                if !(target_cpa > 0.0) || !target_cpa.is_finite() {
                    return Err(ConfigError::InvalidStrategyTarget { name: "target_cpa", value: target_cpa });
                }
            }
            BiddingStrategyConfig::TargetRoas { target_roas } => {
                if !(target_roas > 0.0) || !target_roas.is_finite() {
                    return Err(ConfigError::InvalidStrategyTarget { name: "target_roas", value: target_roas });
                }
            }
            BiddingStrategyConfig::MaximizeConversions { bid_ceiling } => {
                if !(bid_ceiling > 0.0) || !bid_ceiling.is_finite() {
                    return Err(ConfigError::InvalidStrategyTarget { name: "bid_ceiling", value: bid_ceiling });
                }
            }
        }

        Ok(())
    }
}
