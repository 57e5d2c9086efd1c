//! Canonical serialization and hashing of ledger entries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::{LedgerEntry, Outcome};

/// Every entry field except `hash`, in fixed order.
///
/// `context` objects serialize with sorted keys, so the byte form is stable
/// across a store/load cycle.
#[derive(Serialize)]
struct CanonicalEntry<'a> {
    id: &'a str,
    sequence: u64,
    timestamp: &'a DateTime<Utc>,
    actor: &'a str,
    decision: &'a str,
    rationale: &'a str,
    outcome: Outcome,
    coherence_score: Option<f64>,
    context: &'a serde_json::Value,
    parent_entry: Option<&'a str>,
    previous_hash: &'a str,
    signature: Option<&'a str>,
}

/// Canonical byte form of an entry, excluding its hash.
pub fn canonical_bytes(entry: &LedgerEntry) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&CanonicalEntry {
        id: &entry.id,
        sequence: entry.sequence,
        timestamp: &entry.timestamp,
        actor: &entry.actor,
        decision: &entry.decision,
        rationale: &entry.rationale,
        outcome: entry.outcome,
        coherence_score: entry.coherence_score,
        context: &entry.context,
        parent_entry: entry.parent_entry.as_deref(),
        previous_hash: &entry.previous_hash,
        signature: entry.signature.as_deref(),
    })
}

/// Compute SHA256 hash of content.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Hash an entry as it should be stored.
pub fn entry_hash(entry: &LedgerEntry) -> Result<String, serde_json::Error> {
    Ok(compute_hash(&canonical_bytes(entry)?))
}

/// Whether the stored hash matches a recomputation.
pub fn hash_matches(entry: &LedgerEntry) -> bool {
    entry_hash(entry).map(|h| h == entry.hash).unwrap_or(false)
}
