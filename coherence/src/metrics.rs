//! Coherence metric types.

use serde::{Deserialize, Serialize};

/// Kind of flagged region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionType {
    /// Phrases repeated across segments
    HighCurl,
    /// Questions opened and never resolved
    PositiveDivergence,
    /// Conclusion markers crowding the text
    NegativeDivergence,
}

impl RegionType {
    /// Evidence tag for this region.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionType::HighCurl => "high_curl",
            RegionType::PositiveDivergence => "positive_divergence",
            RegionType::NegativeDivergence => "negative_divergence",
        }
    }
}

/// Severity of a flagged region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSeverity {
    /// Outside the comfortable band, still coherent
    Warning,
    /// Breaks coherence
    Critical,
}

/// A flagged region of the analyzed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherenceRegion {
    /// What was flagged
    pub region_type: RegionType,
    /// How bad it is
    pub severity: RegionSeverity,
    /// Human-readable explanation
    pub description: String,
    /// Indices of the contributing segments
    pub segments: Vec<usize>,
}

/// Output of [`crate::CoherenceAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherenceMetrics {
    /// Circularity magnitude in [0, 1]
    pub curl: f64,
    /// Signed expansion in [-1, 1]
    pub divergence: f64,
    /// Share of segments carrying latent ideas, in [0, 1]
    pub potential: f64,
    /// No critical region was flagged
    pub coherent: bool,
    /// Flagged regions, in detection order
    pub regions: Vec<CoherenceRegion>,
    /// Number of segments analyzed
    pub segment_count: usize,
    /// Number of words analyzed
    pub word_count: usize,
}

impl CoherenceMetrics {
    /// Zero-valued, coherent metrics for empty or degenerate input.
    pub fn neutral() -> Self {
        Self {
            curl: 0.0,
            divergence: 0.0,
            potential: 0.0,
            coherent: true,
            regions: vec![],
            segment_count: 0,
            word_count: 0,
        }
    }

    /// Composite score in [0, 1]: `(1 - curl) * (1 - |divergence|)`.
    pub fn score(&self) -> f64 {
        let score = (1.0 - self.curl) * (1.0 - self.divergence.abs());
        if score.is_nan() {
            return 0.0;
        }
        score.clamp(0.0, 1.0)
    }

    /// Regions of the given severity.
    pub fn regions_with(&self, severity: RegionSeverity) -> impl Iterator<Item = &CoherenceRegion> {
        self.regions.iter().filter(move |r| r.severity == severity)
    }

    /// First region of the given type, if flagged.
    pub fn region(&self, region_type: RegionType) -> Option<&CoherenceRegion> {
        self.regions.iter().find(|r| r.region_type == region_type)
    }
}

impl Default for CoherenceMetrics {
    fn default() -> Self {
        Self::neutral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_scores_one() {
        let metrics = CoherenceMetrics::neutral();
        assert!(metrics.coherent);
        assert_eq!(metrics.score(), 1.0);
    }

    #[test]
    fn test_score_combines_curl_and_divergence() {
        let metrics = CoherenceMetrics {
            curl: 0.5,
            divergence: -0.5,
            ..CoherenceMetrics::neutral()
        };
        assert!((metrics.score() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_region_type_tags() {
        assert_eq!(RegionType::HighCurl.as_str(), "high_curl");
        assert_eq!(RegionType::NegativeDivergence.as_str(), "negative_divergence");
    }
}
