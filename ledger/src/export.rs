//! Export of ledger entries.
//!
//! Three forms:
//! - **Narrative**: chronological, human-readable account
//! - **Json**: lossless; [`parse_json_export`] reproduces the entries
//! - **Csv**: header row of field names, RFC 4180 quoting

use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::types::LedgerEntry;

const CSV_HEADER: &[&str] = &[
    "id",
    "sequence",
    "timestamp",
    "actor",
    "decision",
    "rationale",
    "outcome",
    "coherence_score",
    "parent_entry",
    "hash",
    "previous_hash",
    "signature",
    "context",
];

/// Export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Chronological narrative
    Narrative,
    /// Structured, round-trippable JSON
    Json,
    /// Delimited table
    Csv,
}

impl ExportFormat {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Narrative => "narrative",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "narrative" | "human" | "text" => Ok(ExportFormat::Narrative),
            "json" | "structured" => Ok(ExportFormat::Json),
            "csv" | "tabular" => Ok(ExportFormat::Csv),
            other => Err(LedgerError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Render entries in the requested format.
pub fn export(entries: &[LedgerEntry], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Narrative => Ok(narrative(entries)),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        ExportFormat::Csv => Ok(csv(entries)),
    }
}

/// Parse a [`ExportFormat::Json`] payload back into entries.
pub fn parse_json_export(payload: &str) -> Result<Vec<LedgerEntry>> {
    Ok(serde_json::from_str(payload)?)
}

fn narrative(entries: &[LedgerEntry]) -> String {
    let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| (e.timestamp, e.sequence));

    let mut out = format!("Decision ledger: {} entries\n", ordered.len());
    for (i, entry) in ordered.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. [{}] {} decided \"{}\" ({})\n",
            i + 1,
            entry.timestamp.to_rfc3339(),
            entry.actor,
            entry.decision,
            entry.outcome
        ));
        if !entry.rationale.is_empty() {
            out.push_str(&format!("   Rationale: {}\n", entry.rationale));
        }
        if let Some(score) = entry.coherence_score {
            out.push_str(&format!("   Coherence: {score:.2}\n"));
        }
        if let Some(parent) = &entry.parent_entry {
            out.push_str(&format!("   Follows: {parent}\n"));
        }
    }
    out
}

fn csv(entries: &[LedgerEntry]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');

    for entry in entries {
        let row = [
            entry.id.clone(),
            entry.sequence.to_string(),
            entry.timestamp.to_rfc3339(),
            entry.actor.clone(),
            entry.decision.clone(),
            entry.rationale.clone(),
            entry.outcome.as_str().to_string(),
            entry.coherence_score.map(|s| s.to_string()).unwrap_or_default(),
            entry.parent_entry.clone().unwrap_or_default(),
            entry.hash.clone(),
            entry.previous_hash.clone(),
            entry.signature.clone().unwrap_or_default(),
            entry.context.to_string(),
        ];
        let fields: Vec<Cow<'_, str>> = row.iter().map(|f| escape_csv_field(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field containing the delimiter, a quote or a line break,
/// doubling internal quotes.
pub fn escape_csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Outcome, GENESIS_HASH};
    use chrono::{Duration, Utc};

    fn entry(sequence: u64, decision: &str) -> LedgerEntry {
        LedgerEntry {
            id: format!("entry-{sequence}"),
            sequence,
            timestamp: Utc::now() + Duration::seconds(sequence as i64),
            actor: "gate:intent".to_string(),
            decision: decision.to_string(),
            rationale: "Intent declared".to_string(),
            outcome: Outcome::Pass,
            coherence_score: Some(0.8),
            context: serde_json::json!({"artifact_id": "a-1"}),
            parent_entry: None,
            hash: "h".repeat(64),
            previous_hash: GENESIS_HASH.to_string(),
            signature: None,
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("structured".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("TABULAR".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("human".parse::<ExportFormat>().unwrap(), ExportFormat::Narrative);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let entries = vec![entry(0, "first"), entry(1, "second, with comma")];
        let payload = export(&entries, ExportFormat::Json).unwrap();
        let parsed = parse_json_export(&payload).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed, entries);
        assert_eq!(parsed[1].decision, "second, with comma");
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let entries = vec![entry(0, "Approve, then \"ship\"")];
        let payload = export(&entries, ExportFormat::Csv).unwrap();
        let mut lines = payload.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Approve, then \"\"ship\"\"\""));
        // context JSON carries quotes and is quoted as a whole
        assert!(row.ends_with("\"{\"\"artifact_id\"\":\"\"a-1\"\"}\""));
    }

    #[test]
    fn test_escape_plain_field_borrowed() {
        assert!(matches!(escape_csv_field("plain"), Cow::Borrowed("plain")));
        assert_eq!(escape_csv_field("a\nb"), "\"a\nb\"");
    }

    #[test]
    fn test_narrative_is_chronological() {
        let entries = vec![entry(2, "later"), entry(1, "earlier")];
        let payload = export(&entries, ExportFormat::Narrative).unwrap();
        let earlier = payload.find("earlier").unwrap();
        let later = payload.find("later").unwrap();
        assert!(earlier < later);
        assert!(payload.starts_with("Decision ledger: 2 entries"));
        assert!(payload.contains("gate:intent decided"));
        assert!(payload.contains("(pass)"));
    }

    #[test]
    fn test_empty_exports() {
        assert_eq!(export(&[], ExportFormat::Json).unwrap(), "[]");
        assert_eq!(export(&[], ExportFormat::Csv).unwrap().lines().count(), 1);
    }
}
