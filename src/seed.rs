use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::campaign::{AdGroup, CampaignConfig, Keyword};

/// Versioned seed derivation. Any change to how seeds are hashed gets a new
/// variant, so a result tagged `V1` can always be reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedScheme {
    V1,
}

impl SeedScheme {
    fn tag(&self) -> &'static str {
        match self {
            SeedScheme::V1 => "v1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSeed {
    pub scheme: SeedScheme,
    pub value: u64,
}

/// Stable identity of one keyword inside a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeywordKey([u8; 32]);

impl RunSeed {
    /// Hash of the campaign name and every keyword text, sorted so ad group
    /// ordering does not matter.
    pub fn derive(scheme: SeedScheme, config: &CampaignConfig) -> Self {
        let mut texts: Vec<&str> = config
            .ad_groups
            .iter()
            .flat_map(|ag| ag.keywords.iter().map(|k| k.text.as_str()))
            .collect();
        texts.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(scheme.tag().as_bytes());
        hasher.update(b"|");
        hasher.update(config.name.as_bytes());
        hasher.update(b"_");
        hasher.update(texts.join("|").as_bytes());
        let digest = hasher.finalize();

        let mut first = [0u8; 8];
        first.copy_from_slice(&digest[..8]);
        Self { scheme, value: u64::from_be_bytes(first) }
    }

    /// Generator for per-keyword constants (market price level)
    pub fn keyword_rng(&self, keyword: &KeywordKey) -> StdRng {
        let mut hasher = Sha256::new();
        hasher.update(b"keyword");
        hasher.update(self.value.to_be_bytes());
        hasher.update(keyword.0);
        StdRng::from_seed(hasher.finalize().into())
    }

    /// Generator for everything drawn within one auction round: the
    /// competitor field first, then the click and conversion draws.
    /// `round_index` counts rounds for this keyword from the start of the run.
    pub fn round_rng(&self, keyword: &KeywordKey, round_index: u64) -> StdRng {
        let mut hasher = Sha256::new();
        hasher.update(b"round");
        hasher.update(self.value.to_be_bytes());
        hasher.update(keyword.0);
        hasher.update(round_index.to_be_bytes());
        StdRng::from_seed(hasher.finalize().into())
    }

    /// Generator for a per-competitor constant inside a keyword's market
    pub fn competitor_rng(&self, keyword: &KeywordKey, competitor: usize) -> StdRng {
        let mut hasher = Sha256::new();
        hasher.update(b"competitor");
        hasher.update(self.value.to_be_bytes());
        hasher.update(keyword.0);
        hasher.update((competitor as u64).to_be_bytes());
        StdRng::from_seed(hasher.finalize().into())
    }
}

impl KeywordKey {
    pub fn new(ad_group: &AdGroup, keyword: &Keyword) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ad_group.name.as_bytes());
        hasher.update(b"/");
        hasher.update(keyword.text.as_bytes());
        hasher.update(b"/");
        hasher.update(keyword.match_type.as_str().as_bytes());
        Self(hasher.finalize().into())
    }
}
