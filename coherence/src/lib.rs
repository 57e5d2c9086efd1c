//! Heuristic coherence analysis for text blocks.
//!
//! Scores a block of text along three axes borrowed, loosely, from vector
//! field language:
//!
//! - **Curl**: circularity. How much of the text repeats phrases it has
//!   already used in other sentences.
//! - **Divergence**: signed expansion. Positive when questions pile up
//!   without being resolved, negative when conclusion markers crowd a short
//!   text (premature closure).
//! - **Potential**: latent, undeveloped ideas. Informational only.
//!
//! This is pattern analysis, not language understanding. Every threshold
//! lives in [`CoherenceConfig`] and can be tuned per deployment.
//!
//! # Example
//!
//! ```
//! use coherence::CoherenceAnalyzer;
//!
//! let analyzer = CoherenceAnalyzer::new();
//! let metrics = analyzer.analyze("The parser reads tokens. It builds a tree.");
//! assert!(metrics.coherent);
//! ```

pub mod analyzer;
pub mod config;
pub mod metrics;
pub mod segment;

pub use analyzer::CoherenceAnalyzer;
pub use config::{CoherenceConfig, ConfigError};
pub use metrics::{CoherenceMetrics, CoherenceRegion, RegionSeverity, RegionType};
pub use segment::{segment, words, Segment, Terminator};
