use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::campaign::MatchType;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::seed::RunSeed;

/// `numerator / denominator`, or `default` when the denominator is zero or
/// the division would not produce a finite number
pub fn ratio_or(numerator: f64, denominator: f64, default: f64) -> f64 {
    if denominator == 0.0 {
        return default;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        default
    }
}

/// Performance of one keyword on one simulated day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyKeywordRecord {
    pub date: NaiveDate,
    pub day_index: u32,
    pub ad_group: String,
    pub keyword: String,
    pub match_type: MatchType,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub cost: f64,
    pub revenue: f64,
    /// Impression-weighted; 0 when never shown
    pub avg_position: f64,
    pub avg_cpc: f64,
    pub quality_score: f64,
    /// Strategy bid for the day, before device adjustments and pacing
    pub bid: f64,
    /// Rounds the ad could have entered (after negatives and schedule)
    pub eligible_rounds: u64,
    pub lost_budget_rounds: u64,
    pub lost_rank_rounds: u64,
    pub filtered_negative: u64,
    pub filtered_schedule: u64,
    pub impression_share: f64,
    pub lost_is_budget: f64,
    pub lost_is_rank: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CampaignTotals {
    pub total_spend: f64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_conversions: u64,
    pub total_revenue: f64,
    pub avg_cpc: f64,
    pub avg_cpa: f64,
    pub roas: f64,
    pub ctr: f64,
    pub conversion_rate: f64,
}

impl CampaignTotals {
    pub fn from_records(records: &[DailyKeywordRecord]) -> Self {
        let mut totals = CampaignTotals::default();
        for record in records {
            totals.total_spend += record.cost;
            totals.total_impressions += record.impressions;
            totals.total_clicks += record.clicks;
            totals.total_conversions += record.conversions;
            totals.total_revenue += record.revenue;
        }
        totals.avg_cpc = ratio_or(totals.total_spend, totals.total_clicks as f64, 0.0);
        totals.avg_cpa = ratio_or(totals.total_spend, totals.total_conversions as f64, 0.0);
        totals.roas = ratio_or(totals.total_revenue, totals.total_spend, 0.0);
        totals.ctr = ratio_or(totals.total_clicks as f64, totals.total_impressions as f64, 0.0);
        totals.conversion_rate = ratio_or(totals.total_conversions as f64, totals.total_clicks as f64, 0.0);
        totals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Automated bid step pulled back into [0.5, 2.0] x prior bid
    BidStepClamped,
    /// Quality signal fell outside [1, 10]
    QualityClamped,
    /// Second price above the effective bid; the bid was charged
    CpcCapped,
    /// Paced bid above the remaining daily budget
    BudgetCapped,
}

/// A value that had to be clamped into its allowed range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub day_index: u32,
    pub keyword: String,
    pub kind: DiagnosticKind,
    pub original: f64,
    pub clamped_to: f64,
}

/// Everything a run hands back to reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub campaign: String,
    pub seed: RunSeed,
    /// Ordered by day, then ad group, then keyword
    pub records: Vec<DailyKeywordRecord>,
    pub totals: CampaignTotals,
    pub diagnostics: Vec<Diagnostic>,
}

impl SimulationResult {
    pub fn records_for<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a DailyKeywordRecord> + 'a {
        self.records.iter().filter(move |r| r.keyword == keyword)
    }

    /// Spend per day across all keywords, in date order
    pub fn daily_spend(&self) -> Vec<(NaiveDate, f64)> {
        let mut days: Vec<(NaiveDate, f64)> = Vec::new();
        for record in &self.records {
            if let Some((date, spend)) = days.last_mut() {
                if *date == record.date {
                    *spend += record.cost;
                    continue;
                }
            }
            days.push((record.date, record.cost));
        }
        days
    }

    /// Impressions per day across all keywords, in date order
    pub fn daily_impressions(&self) -> Vec<(NaiveDate, u64)> {
        let mut days: Vec<(NaiveDate, u64)> = Vec::new();
        for record in &self.records {
            if let Some((date, impressions)) = days.last_mut() {
                if *date == record.date {
                    *impressions += record.impressions;
                    continue;
                }
            }
            days.push((record.date, record.impressions));
        }
        days
    }

    pub fn printout(&self, logger: &mut Logger, event: LogEvent) {
        let t = &self.totals;
        logln!(logger, event, "\nCampaign {} (seed {:?}/{:016x})", self.campaign, self.seed.scheme, self.seed.value);
        logln!(logger, event, "  Impressions: {}  Clicks: {}  Conversions: {}", t.total_impressions, t.total_clicks, t.total_conversions);
        logln!(logger, event, "  Spend: {:.2}  Revenue: {:.2}  ROAS: {:.2}", t.total_spend, t.total_revenue, t.roas);
        logln!(logger, event, "  CTR: {:.2}%  CVR: {:.2}%  Avg CPC: {:.2}  Avg CPA: {:.2}", t.ctr * 100.0, t.conversion_rate * 100.0, t.avg_cpc, t.avg_cpa);
        if !self.diagnostics.is_empty() {
            logln!(logger, event, "  Clamped or capped values: {}", self.diagnostics.len());
        }
    }
}
