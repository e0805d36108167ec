use chrono::NaiveDate;
use thiserror::Error;

/// Reasons a campaign configuration is rejected before any auction runs.
/// Once a run starts it always completes, so this is the only failure callers see.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("campaign '{0}' has no keywords")]
    NoKeywords(String),

    #[error("ad group '{0}' has no keywords")]
    EmptyAdGroup(String),

    #[error("daily budget must be positive, got {0}")]
    NonPositiveBudget(f64),

    #[error("date range is inverted: start {start} is after end {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("date range covers {days} days, more than the allowed {max_days}")]
    DateRangeTooLong { days: u32, max_days: u32 },

    #[error("keyword '{keyword}' has an invalid bid {bid}")]
    InvalidBid { keyword: String, bid: f64 },

    #[error("bidding strategy target {name} must be positive, got {value}")]
    InvalidStrategyTarget { name: &'static str, value: f64 },

    #[error("{device} bid adjustment must be a non-negative number, got {value}")]
    InvalidDeviceAdjustment { device: &'static str, value: f64 },

    #[error("extension '{text}' in ad group '{ad_group}' has quality {quality}, expected 0 to 1")]
    InvalidExtension { ad_group: String, text: String, quality: f64 },

    #[error("invalid simulation settings: {0}")]
    InvalidSettings(String),
}
