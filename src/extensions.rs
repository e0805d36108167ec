//! Ad extensions (sitelinks, callouts, ...) and what they do to an ad:
//! a higher click-through rate and a small quality score lift.

use serde::{Deserialize, Serialize};

/// Combined CTR multiplier never goes past +50%
pub const MAX_CTR_MULTIPLIER: f64 = 1.5;
/// Quality score points extensions can add at most
pub const MAX_QUALITY_BOOST: f64 = 2.0;

fn default_quality() -> f64 {
    0.8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionType {
    Sitelink,
    Callout,
    StructuredSnippet,
    Call,
    Location,
    Price,
    App,
    Promotion,
    Image,
}

impl ExtensionType {
    /// CTR uplift of a perfectly written extension of this type
    pub fn ctr_uplift(&self) -> f64 {
        match self {
            ExtensionType::Sitelink => 0.20,
            ExtensionType::Callout => 0.10,
            ExtensionType::StructuredSnippet => 0.08,
            ExtensionType::Call => 0.15,
            ExtensionType::Location => 0.12,
            ExtensionType::Price => 0.18,
            ExtensionType::App => 0.10,
            ExtensionType::Promotion => 0.22,
            ExtensionType::Image => 0.25,
        }
    }

    /// Quality score points of a perfectly written extension of this type
    pub fn quality_uplift(&self) -> f64 {
        match self {
            ExtensionType::Sitelink => 0.30,
            ExtensionType::Callout => 0.20,
            ExtensionType::StructuredSnippet => 0.15,
            ExtensionType::Call => 0.25,
            ExtensionType::Location => 0.20,
            ExtensionType::Price => 0.15,
            ExtensionType::App => 0.15,
            ExtensionType::Promotion => 0.20,
            ExtensionType::Image => 0.30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdExtension {
    #[serde(rename = "type")]
    pub kind: ExtensionType,
    #[serde(default)]
    pub text: String,
    /// 0.0 - 1.0, how well written and relevant it is
    #[serde(default = "default_quality")]
    pub quality: f64,
}

impl AdExtension {
    pub fn new(kind: ExtensionType, text: &str) -> Self {
        Self { kind, text: text.to_string(), quality: default_quality() }
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }
}

/// Multiplier on the click-through rate of an ad carrying `extensions`
pub fn ctr_multiplier(extensions: &[AdExtension]) -> f64 {
    extensions
        .iter()
        .map(|ext| 1.0 + ext.kind.ctr_uplift() * ext.quality.clamp(0.0, 1.0))
        .product::<f64>()
        .min(MAX_CTR_MULTIPLIER)
}

/// Quality score points added on top of the keyword's own score
pub fn quality_boost(extensions: &[AdExtension]) -> f64 {
    extensions
        .iter()
        .map(|ext| ext.kind.quality_uplift() * ext.quality.clamp(0.0, 1.0))
        .sum::<f64>()
        .min(MAX_QUALITY_BOOST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_extensions_change_nothing() {
        assert_eq!(ctr_multiplier(&[]), 1.0);
        assert_eq!(quality_boost(&[]), 0.0);
    }

    #[test]
    fn test_uplift_scales_with_quality() {
        let sitelink = AdExtension::new(ExtensionType::Sitelink, "Sale").with_quality(1.0);
        assert_relative_eq!(ctr_multiplier(&[sitelink.clone()]), 1.20);
        assert_relative_eq!(quality_boost(&[sitelink]), 0.30);

        let weak = AdExtension::new(ExtensionType::Sitelink, "Sale").with_quality(0.5);
        assert_relative_eq!(ctr_multiplier(&[weak]), 1.10);
    }

    #[test]
    fn test_many_extensions_are_capped() {
        // every type once plus two more sitelinks
        let all: Vec<AdExtension> = [
            ExtensionType::Sitelink,
            ExtensionType::Sitelink,
            ExtensionType::Sitelink,
            ExtensionType::Image,
            ExtensionType::Promotion,
            ExtensionType::Price,
            ExtensionType::Call,
            ExtensionType::Callout,
            ExtensionType::Location,
            ExtensionType::App,
            ExtensionType::StructuredSnippet,
        ]
        .into_iter()
        .map(|kind| AdExtension::new(kind, "x").with_quality(1.0))
        .collect();
        assert_eq!(ctr_multiplier(&all), MAX_CTR_MULTIPLIER);
        assert_eq!(quality_boost(&all), MAX_QUALITY_BOOST);
    }

    #[test]
    fn test_extension_json_uses_type_tag() {
        let ext: AdExtension = serde_json::from_str(r#"{ "type": "structured_snippet", "text": "Brands" }"#).unwrap();
        assert_eq!(ext.kind, ExtensionType::StructuredSnippet);
        assert_relative_eq!(ext.quality, 0.8);
    }
}
