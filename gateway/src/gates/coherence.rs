//! COHERENCE: structural quality of the content.

use async_trait::async_trait;
use coherence::{CoherenceAnalyzer, CoherenceConfig, RegionSeverity, RegionType};

use super::{Gate, GateKind};
use crate::artifact::Artifact;
use crate::evidence::{Evidence, Finding, Severity};
use crate::types::{EvaluationContext, GateResult};

/// Runs the coherence analyzer over the content.
///
/// Passes when no critical region is flagged and the score reaches the
/// effective threshold.
pub struct CoherenceGate {
    analyzer: CoherenceAnalyzer,
}

impl CoherenceGate {
    pub fn new(config: CoherenceConfig) -> Self {
        Self {
            analyzer: CoherenceAnalyzer::with_config(config),
        }
    }
}

impl Default for CoherenceGate {
    fn default() -> Self {
        Self::new(CoherenceConfig::default())
    }
}

fn region_finding(region_type: RegionType, segments: Vec<usize>) -> Finding {
    match region_type {
        RegionType::HighCurl => Finding::HighCurl { segments },
        RegionType::PositiveDivergence => Finding::PositiveDivergence { segments },
        RegionType::NegativeDivergence => Finding::NegativeDivergence { segments },
    }
}

#[async_trait]
impl Gate for CoherenceGate {
    fn name(&self) -> &str {
        GateKind::Coherence.as_str()
    }

    async fn evaluate(&self, artifact: &Artifact, context: &EvaluationContext) -> GateResult {
        let metrics = self.analyzer.analyze(&artifact.content);
        let score = metrics.score();
        let threshold = context.coherence_threshold;
        let meets_threshold = score >= threshold;
        let passed = metrics.coherent && meets_threshold;

        let summary = format!(
            "Score {score:.2} (threshold {threshold:.2}); curl {:.2}, divergence {:.2}, potential {:.2}",
            metrics.curl, metrics.divergence, metrics.potential
        );
        let mut evidence = vec![Evidence::new(
            Finding::CoherenceSummary {
                score,
                threshold,
                curl: metrics.curl,
                divergence: metrics.divergence,
                potential: metrics.potential,
                coherent: metrics.coherent,
            },
            if meets_threshold {
                Severity::Info
            } else {
                Severity::Critical
            },
            summary.clone(),
        )];

        for region in &metrics.regions {
            let severity = match region.severity {
                RegionSeverity::Warning => Severity::Warning,
                RegionSeverity::Critical => Severity::Critical,
            };
            evidence.push(Evidence::new(
                region_finding(region.region_type, region.segments.clone()),
                severity,
                region.description.clone(),
            ));
        }

        let reasoning = if passed {
            format!("Content is coherent. {summary}")
        } else if !metrics.coherent {
            let flagged: Vec<&str> = metrics
                .regions_with(RegionSeverity::Critical)
                .map(|r| r.region_type.as_str())
                .collect();
            format!("Critical regions flagged: {}. {summary}", flagged.join(", "))
        } else {
            format!("Score below threshold. {summary}")
        };

        GateResult::new(self.name(), passed, reasoning, evidence).with_coherence_score(score)
    }
}
