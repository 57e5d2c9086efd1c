//! ORIGIN: provenance.

use async_trait::async_trait;

use super::{Gate, GateKind};
use crate::artifact::Artifact;
use crate::evidence::{Evidence, Finding};
use crate::types::{EvaluationContext, GateResult};

/// Checks that an artifact declares where it came from.
///
/// A missing source fails the gate. A missing author is only a warning.
/// Signatures and audit-trail references are recorded, not verified.
#[derive(Debug, Default)]
pub struct OriginGate;

impl OriginGate {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Gate for OriginGate {
    fn name(&self) -> &str {
        GateKind::Origin.as_str()
    }

    async fn evaluate(&self, artifact: &Artifact, _context: &EvaluationContext) -> GateResult {
        let mut evidence = Vec::new();

        let source = artifact.declared_source();
        if source.is_none() {
            evidence.push(Evidence::critical(
                Finding::SourceMissing,
                "Artifact declares no source",
            ));
        }

        let author = artifact.declared_author();
        if author.is_none() {
            evidence.push(Evidence::warning(
                Finding::AuthorMissing,
                "Artifact declares no author",
            ));
        }

        if artifact.declared_signature().is_some() {
            evidence.push(Evidence::info(
                Finding::SignaturePresent,
                "Artifact carries a signature (recorded, not verified)",
            ));
        }

        if let Some(entry_id) = artifact
            .metadata
            .audit_trail_ref
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
        {
            evidence.push(Evidence::info(
                Finding::AuditTrailLinked {
                    entry_id: entry_id.to_string(),
                },
                format!("Artifact references prior decision {entry_id}"),
            ));
        }

        match source {
            Some(source) => {
                let reasoning = match author {
                    Some(author) => format!("Provenance declared: {source} by {author}"),
                    None => format!("Provenance declared: {source} (author unknown)"),
                };
                GateResult::pass(self.name(), reasoning, evidence)
            }
            None => GateResult::fail(
                self.name(),
                "Provenance cannot be established without a declared source",
                evidence,
            ),
        }
    }
}
