use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::campaign::{AdGroup, Keyword};
use crate::extensions::quality_boost;
use crate::matching::word_set;

pub const WEIGHT_EXPECTED_CTR: f64 = 0.40;
pub const WEIGHT_AD_RELEVANCE: f64 = 0.35;
pub const WEIGHT_LANDING_PAGE: f64 = 0.25;

/// Impressions at which observed CTR and the prior carry equal weight
const CTR_CONFIDENCE_IMPRESSIONS: f64 = 200.0;

pub const MIN_QUALITY: f64 = 1.0;
pub const MAX_QUALITY: f64 = 10.0;

/// Quality score, always within [1, 10]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct QualityScore(f64);

impl QualityScore {
    /// Clamp a value onto [1, 10]. Returns the score and whether clamping was
    /// needed.
    pub fn from_value(value: f64) -> (Self, bool) {
        if value.is_nan() {
            return (QualityScore(MIN_QUALITY), true);
        }
        let clamped = value.clamp(MIN_QUALITY, MAX_QUALITY);
        (QualityScore(clamped), clamped != value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Relevance scaling applied to position CTR: 0.5 at QS 1, 1.0 at QS 10
    pub fn relevance_scale(&self) -> f64 {
        0.5 + 0.5 * (self.0 - MIN_QUALITY) / (MAX_QUALITY - MIN_QUALITY)
    }
}

/// Click-through outcome of a single day for one keyword
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayCtr {
    pub impressions: u64,
    pub clicks: u64,
    /// Clicks the position curve predicted for the impressions served
    pub expected_clicks: f64,
}

/// Day-indexed click history of one keyword. Entry `d` holds day `d`.
#[derive(Debug, Clone, Default)]
pub struct KeywordHistory {
    days: Vec<DayCtr>,
}

impl KeywordHistory {
    pub fn push_day(&mut self, day: DayCtr) {
        self.days.push(day);
    }

    /// Aggregate of every day strictly before `day_index`
    pub fn before(&self, day_index: usize) -> DayCtr {
        self.days.iter().take(day_index).fold(DayCtr::default(), |acc, d| DayCtr {
            impressions: acc.impressions + d.impressions,
            clicks: acc.clicks + d.clicks,
            expected_clicks: acc.expected_clicks + d.expected_clicks,
        })
    }
}

/// Signals the score is built from, for reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityBreakdown {
    pub expected_ctr: f64,
    pub ad_relevance: f64,
    pub landing_page: f64,
    /// Weighted signal before mapping onto [1, 10]
    pub raw: f64,
    /// Points added by the ad group's extensions
    pub extension_boost: f64,
    /// Mapped signal plus extension boost, before clamping
    pub unclamped: f64,
    pub score: QualityScore,
    pub clamped: bool,
}

pub struct QualityModel {
    ctr_feedback: bool,
}

impl QualityModel {
    pub fn new(ctr_feedback: bool) -> Self {
        Self { ctr_feedback }
    }

    /// Quality of `keyword` in `ad_group` on `day_index`. Only history from
    /// earlier days is consulted.
    pub fn score(&self, keyword: &Keyword, ad_group: &AdGroup, final_url: Option<&str>, history: &KeywordHistory, day_index: usize) -> QualityBreakdown {
        let ad_relevance = ad_relevance(keyword, ad_group);
        let prior_ctr = 0.5 * keyword.match_type.ctr_baseline() + 0.5 * ad_relevance;
        let expected_ctr = if self.ctr_feedback {
            blend_observed_ctr(prior_ctr, &history.before(day_index))
        } else {
            prior_ctr
        };
        let landing_page = final_url.map(landing_page_score).unwrap_or(0.5);

        let raw = WEIGHT_EXPECTED_CTR * expected_ctr.clamp(0.0, 1.0)
            + WEIGHT_AD_RELEVANCE * ad_relevance.clamp(0.0, 1.0)
            + WEIGHT_LANDING_PAGE * landing_page.clamp(0.0, 1.0);
        let extension_boost = quality_boost(&ad_group.extensions);
        let unclamped = MIN_QUALITY + raw * (MAX_QUALITY - MIN_QUALITY) + extension_boost;
        let (score, clamped) = QualityScore::from_value(unclamped);

        QualityBreakdown { expected_ctr, ad_relevance, landing_page, raw, extension_boost, unclamped, score, clamped }
    }
}

/// Pull the prior towards what was actually observed, weighted by how many
/// impressions back the observation. A keyword clicking exactly as predicted
/// keeps its prior.
fn blend_observed_ctr(prior: f64, history: &DayCtr) -> f64 {
    if history.impressions == 0 || history.expected_clicks <= 0.0 {
        return prior;
    }
    let index = history.clicks as f64 / history.expected_clicks;
    let observed = (prior * index).min(1.0);
    let impressions = history.impressions as f64;
    let confidence = impressions / (impressions + CTR_CONFIDENCE_IMPRESSIONS);
    (1.0 - confidence) * prior + confidence * observed
}

/// Word overlap between the keyword and the ad text (group name + headlines)
pub fn ad_relevance(keyword: &Keyword, ad_group: &AdGroup) -> f64 {
    let keyword_words = word_set(&keyword.text);
    if keyword_words.is_empty() {
        return 0.1;
    }
    let ad_text = std::iter::once(ad_group.name.as_str())
        .chain(ad_group.headlines.iter().map(|h| h.as_str()))
        .collect::<Vec<_>>()
        .join(" ");
    let ad_words = word_set(&ad_text);

    let overlap = keyword_words.intersection(&ad_words).count() as f64 / keyword_words.len() as f64;
    // The query is the keyword itself, so keyword-query overlap is total
    let mut relevance = 0.4 + 0.4 * overlap + 0.2 * overlap;

    let normalized_ad = crate::matching::normalize(&ad_text);
    if normalized_ad.contains(&crate::matching::normalize(&keyword.text)) {
        relevance *= 1.2;
    }
    relevance.clamp(0.1, 1.0)
}

/// Landing page experience proxy from URL shape alone
pub fn landing_page_score(url: &str) -> f64 {
    let url = url.trim();
    if url.is_empty() {
        return 0.5;
    }
    let lower = url.to_lowercase();
    let mut score = 0.5;

    if lower.starts_with("https://") {
        score += 0.05;
    }

    score += 0.1 * (1.0 - (url.len() as f64 / 80.0).min(1.0));

    let without_scheme = lower.split_once("://").map(|(_, rest)| rest).unwrap_or(&lower);
    let (location, query) = match without_scheme.split_once('?') {
        Some((location, query)) => (location, query),
        None => (without_scheme, ""),
    };
    let mut parts = location.split('/');
    let domain = parts.next().unwrap_or("");
    let depth = parts.filter(|p| !p.is_empty()).count();
    if depth > 2 {
        score -= 0.05 * (depth - 2) as f64;
    }

    if ["utm_", "gclid", "fbclid"].iter().any(|t| query.contains(t)) {
        score -= 0.1;
    }

    if [".com", ".org", ".edu", ".gov"].iter().any(|tld| domain.ends_with(tld)) {
        score += 0.05;
    }

    // Stable per-URL variation
    let digest = Sha256::digest(url.as_bytes());
    score += (digest[0] as f64 / 255.0 - 0.5) * 0.1;

    score.clamp(0.1, 1.0)
}
