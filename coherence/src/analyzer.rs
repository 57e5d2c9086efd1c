//! The coherence analyzer.
//!
//! Stateless: the same text and config always produce the same metrics.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::CoherenceConfig;
use crate::metrics::{CoherenceMetrics, CoherenceRegion, RegionSeverity, RegionType};
use crate::segment::{segment, Segment};

/// Phrases that close an argument.
const RESOLUTION_MARKERS: &[&[&str]] = &[
    &["therefore"],
    &["thus"],
    &["hence"],
    &["consequently"],
    &["accordingly"],
    &["ultimately"],
    &["finally"],
    &["in", "conclusion"],
    &["in", "summary"],
    &["to", "conclude"],
    &["to", "summarize"],
    &["as", "a", "result"],
    &["it", "follows", "that"],
];

/// Phrases that open a line of inquiry without a question mark.
const OPEN_MARKERS: &[&[&str]] = &[&["what", "if"], &["i", "wonder"], &["it", "remains", "unclear"]];

/// Phrases that mark an idea as latent rather than developed.
const LATENT_MARKERS: &[&[&str]] = &[
    &["could"],
    &["might"],
    &["perhaps"],
    &["maybe"],
    &["possibly"],
    &["potentially"],
    &["someday"],
    &["eventually"],
    &["what", "if"],
    &["in", "the", "future"],
];

/// Heuristic coherence scorer.
#[derive(Debug, Clone, Default)]
pub struct CoherenceAnalyzer {
    config: CoherenceConfig,
}

impl CoherenceAnalyzer {
    /// Create an analyzer with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom thresholds.
    pub fn with_config(config: CoherenceConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &CoherenceConfig {
        &self.config
    }

    /// Analyze a block of text.
    ///
    /// Empty or punctuation-only input yields [`CoherenceMetrics::neutral`].
    pub fn analyze(&self, text: &str) -> CoherenceMetrics {
        let segments = segment(text);
        let segment_words: Vec<Vec<String>> = segments.iter().map(Segment::words).collect();
        let word_count: usize = segment_words.iter().map(Vec::len).sum();

        if segments.is_empty() || word_count == 0 {
            return CoherenceMetrics::neutral();
        }

        let mut regions = Vec::new();

        let (curl, repeating) = self.curl(&segment_words);
        if curl > self.config.curl_warning {
            let severity = if curl > self.config.curl_critical {
                RegionSeverity::Critical
            } else {
                RegionSeverity::Warning
            };
            regions.push(CoherenceRegion {
                region_type: RegionType::HighCurl,
                severity,
                description: format!(
                    "{:.0}% of phrases recur across segments (curl {:.2})",
                    curl * 100.0,
                    curl
                ),
                segments: repeating,
            });
        }

        let divergence = self.divergence(&segments, &segment_words, word_count, &mut regions);
        let potential = potential(&segment_words);

        let coherent = !regions.iter().any(|r| r.severity == RegionSeverity::Critical);

        debug!(
            segments = segments.len(),
            words = word_count,
            curl = curl,
            divergence = divergence,
            potential = potential,
            coherent = coherent,
            "Coherence analyzed"
        );

        CoherenceMetrics {
            curl,
            divergence,
            potential,
            coherent,
            regions,
            segment_count: segments.len(),
            word_count,
        }
    }

    /// Share of each segment's n-grams that also occur in another segment.
    fn curl(&self, segment_words: &[Vec<String>]) -> (f64, Vec<usize>) {
        if segment_words.len() < 2 {
            return (0.0, vec![]);
        }

        let longest = segment_words.iter().map(Vec::len).max().unwrap_or(0);
        let n = self.config.ngram_size.min(longest);
        if n == 0 {
            return (0.0, vec![]);
        }

        let grams: Vec<HashSet<&[String]>> = segment_words
            .iter()
            .map(|words| words.windows(n).collect())
            .collect();

        let mut frequency: HashMap<&[String], usize> = HashMap::new();
        for set in &grams {
            for gram in set {
                *frequency.entry(*gram).or_insert(0) += 1;
            }
        }

        let total: usize = grams.iter().map(HashSet::len).sum();
        if total == 0 {
            return (0.0, vec![]);
        }

        let mut repeated = 0;
        let mut contributing = Vec::new();
        for (idx, set) in grams.iter().enumerate() {
            let shared = set
                .iter()
                .filter(|gram| frequency.get(*gram).copied().unwrap_or(0) > 1)
                .count();
            if shared > 0 {
                contributing.push(idx);
            }
            repeated += shared;
        }

        (repeated as f64 / total as f64, contributing)
    }

    /// Unresolved-question ratio minus weighted closure-marker density.
    fn divergence(
        &self,
        segments: &[Segment],
        segment_words: &[Vec<String>],
        word_count: usize,
        regions: &mut Vec<CoherenceRegion>,
    ) -> f64 {
        let last_resolution = segment_words
            .iter()
            .rposition(|words| contains_any(words, RESOLUTION_MARKERS));

        let open: Vec<usize> = segments
            .iter()
            .zip(segment_words)
            .enumerate()
            .filter(|(_, (seg, words))| seg.is_question() || contains_any(words, OPEN_MARKERS))
            .filter(|(idx, _)| last_resolution.map_or(true, |r| *idx > r))
            .map(|(idx, _)| idx)
            .collect();

        let closing: Vec<usize> = segment_words
            .iter()
            .enumerate()
            .filter(|(_, words)| contains_any(words, RESOLUTION_MARKERS))
            .map(|(idx, _)| idx)
            .collect();
        let closure_count: usize = segment_words
            .iter()
            .map(|words| count_markers(words, RESOLUTION_MARKERS))
            .sum();

        let expansion = open.len() as f64 / segments.len() as f64;
        let pressure = closure_count as f64 / word_count as f64 * self.config.closure_weight;
        let divergence = (expansion - pressure).clamp(-1.0, 1.0);

        if divergence > self.config.positive_divergence_warning {
            let severity = if divergence > self.config.positive_divergence_critical {
                RegionSeverity::Critical
            } else {
                RegionSeverity::Warning
            };
            regions.push(CoherenceRegion {
                region_type: RegionType::PositiveDivergence,
                severity,
                description: format!(
                    "{} of {} segments open questions that are never resolved (divergence {:.2})",
                    open.len(),
                    segments.len(),
                    divergence
                ),
                segments: open,
            });
        } else if divergence < self.config.negative_divergence_warning {
            let severity = if divergence < self.config.negative_divergence_critical {
                RegionSeverity::Critical
            } else {
                RegionSeverity::Warning
            };
            regions.push(CoherenceRegion {
                region_type: RegionType::NegativeDivergence,
                severity,
                description: format!(
                    "{} conclusion markers in {} words: premature closure (divergence {:.2})",
                    closure_count, word_count, divergence
                ),
                segments: closing,
            });
        }

        divergence
    }
}

fn potential(segment_words: &[Vec<String>]) -> f64 {
    if segment_words.is_empty() {
        return 0.0;
    }
    let latent = segment_words
        .iter()
        .filter(|words| contains_any(words, LATENT_MARKERS))
        .count();
    latent as f64 / segment_words.len() as f64
}

fn count_phrase(words: &[String], phrase: &[&str]) -> usize {
    if phrase.is_empty() || phrase.len() > words.len() {
        return 0;
    }
    words
        .windows(phrase.len())
        .filter(|window| window.iter().zip(phrase).all(|(w, p)| w == p))
        .count()
}

fn count_markers(words: &[String], markers: &[&[&str]]) -> usize {
    markers.iter().map(|phrase| count_phrase(words, phrase)).sum()
}

fn contains_any(words: &[String], markers: &[&[&str]]) -> bool {
    markers.iter().any(|phrase| count_phrase(words, phrase) > 0)
}
