//! Core ledger types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `previous_hash` of the first entry in a ledger.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Outcome recorded with a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Decision carried out
    Success,
    /// Decision could not be carried out
    Failure,
    /// Decision awaiting resolution
    Pending,
    /// Validation gate passed
    Pass,
    /// Validation gate failed
    Fail,
}

impl Outcome {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Pending => "pending",
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, hash-chained ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID
    pub id: String,
    /// Position in global append order (0-based)
    pub sequence: u64,
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
    /// Who made the decision
    pub actor: String,
    /// What was decided
    pub decision: String,
    /// Why
    pub rationale: String,
    /// Outcome label
    pub outcome: Outcome,
    /// Coherence score in [0, 1], when one applies
    pub coherence_score: Option<f64>,
    /// Opaque context payload
    pub context: serde_json::Value,
    /// Causally prior entry
    pub parent_entry: Option<String>,
    /// SHA-256 over every other field
    pub hash: String,
    /// Hash of the entry appended immediately before this one
    pub previous_hash: String,
    /// Opaque signature, carried but not checked
    pub signature: Option<String>,
}

/// A decision to append, before it is sequenced and hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub actor: String,
    pub decision: String,
    pub rationale: String,
    pub outcome: Outcome,
    pub coherence_score: Option<f64>,
    pub context: serde_json::Value,
    pub parent_entry: Option<String>,
    pub signature: Option<String>,
}

impl NewEntry {
    /// Create a new entry with an empty context.
    pub fn new(
        actor: impl Into<String>,
        decision: impl Into<String>,
        rationale: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            actor: actor.into(),
            decision: decision.into(),
            rationale: rationale.into(),
            outcome,
            coherence_score: None,
            context: serde_json::Value::Object(serde_json::Map::new()),
            parent_entry: None,
            signature: None,
        }
    }

    /// Attach a coherence score.
    pub fn with_coherence_score(mut self, score: f64) -> Self {
        self.coherence_score = Some(score);
        self
    }

    /// Attach a context payload.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Link to a causally prior entry.
    pub fn with_parent(mut self, parent_entry: impl Into<String>) -> Self {
        self.parent_entry = Some(parent_entry.into());
        self
    }

    /// Attach an opaque signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// Filter for [`crate::Ledger::query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    /// Only entries from this actor
    pub actor: Option<String>,
    /// Only entries with this outcome
    pub outcome: Option<Outcome>,
    /// Keep at most this many of the most recent matches
    pub limit: Option<usize>,
}

impl QueryFilter {
    /// Match entries from an actor.
    pub fn actor(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            ..Default::default()
        }
    }

    /// Restrict to an outcome.
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Cap the number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, entry: &LedgerEntry) -> bool {
        self.actor.as_ref().map_or(true, |a| &entry.actor == a)
            && self.outcome.map_or(true, |o| entry.outcome == o)
    }
}

/// Causal path from a root entry to a target, with integrity status.
#[derive(Debug, Clone)]
pub struct ChainView {
    /// Entries from root to target
    pub entries: Vec<LedgerEntry>,
    /// First entry of the path
    pub root: LedgerEntry,
    /// Number of entries in the path
    pub depth: usize,
    /// Every path entry hashes correctly and links to its global predecessor
    pub integrity_valid: bool,
    /// Parent ID referenced but not present in the ledger
    pub missing_parent: Option<String>,
}

/// Result of a full ledger scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// No tampering, broken links or unreadable records
    pub valid: bool,
    /// Records scanned
    pub total_entries: usize,
    /// `previous_hash` links that do not match the prior entry
    pub broken_chains: usize,
    /// IDs of entries whose recomputed hash differs from the stored one
    pub tampered_entries: Vec<String>,
    /// Storage keys of records that could not be parsed
    pub unreadable_entries: Vec<String>,
}

/// Summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Readable entries
    pub total_entries: usize,
    /// Entry count per outcome label
    pub by_outcome: BTreeMap<String, usize>,
    /// Hash the next entry will link to
    pub head_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serde_labels() {
        assert_eq!(serde_json::to_string(&Outcome::Pass).unwrap(), "\"pass\"");
        let parsed: Outcome = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, Outcome::Pending);
    }

    #[test]
    fn test_new_entry_builder() {
        let entry = NewEntry::new("alice", "Merge", "Reviewed", Outcome::Success)
            .with_coherence_score(0.9)
            .with_parent("parent-1")
            .with_signature("sig")
            .with_context(serde_json::json!({"pr": 42}));
        assert_eq!(entry.coherence_score, Some(0.9));
        assert_eq!(entry.parent_entry.as_deref(), Some("parent-1"));
        assert_eq!(entry.context["pr"], 42);
    }

    #[test]
    fn test_genesis_hash_shape() {
        assert_eq!(GENESIS_HASH.len(), 64);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }
}
