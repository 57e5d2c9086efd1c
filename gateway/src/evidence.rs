//! Typed evidence attached to gate results.
//!
//! Evidence serializes as a flat record with a stable `type` tag and an
//! optional `value` payload, plus severity and description:
//!
//! ```json
//! {"type": "insufficient_permissions",
//!  "value": {"required": ["read", "write"], "granted": ["read"], "missing": ["write"]},
//!  "severity": "critical",
//!  "description": "..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gates::SensitiveCapability;

/// How much a piece of evidence weighs on the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// What a gate observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Finding {
    // ORIGIN
    SourceMissing,
    AuthorMissing,
    SignaturePresent,
    AuditTrailLinked {
        entry_id: String,
    },

    // INTENT
    IntentMissing,
    SensitivePatternsDetected {
        capability: SensitiveCapability,
        matches: Vec<String>,
    },
    UndeclaredCapabilities {
        capabilities: Vec<SensitiveCapability>,
    },

    // COHERENCE
    CoherenceSummary {
        score: f64,
        threshold: f64,
        curl: f64,
        divergence: f64,
        potential: f64,
        coherent: bool,
    },
    HighCurl {
        segments: Vec<usize>,
    },
    PositiveDivergence {
        segments: Vec<usize>,
    },
    NegativeDivergence {
        segments: Vec<usize>,
    },

    // IDENTITY
    TypeMissing,
    TypeMismatch {
        declared: String,
        reason: String,
    },
    TypeUnrecognized {
        declared: String,
    },
    InterfaceContractCheck {
        required: Vec<String>,
        missing: Vec<String>,
    },

    // PASSAGE
    InsufficientPermissions {
        required: Vec<String>,
        granted: Vec<String>,
        missing: Vec<String>,
    },
    EnvironmentNotAllowed {
        environment: String,
        allowed: Vec<String>,
    },

    /// A planned gate that is not registered
    GateNotFound {
        gate: String,
    },

    /// Emitted by custom gates
    Custom {
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<Value>,
    },
}

impl Finding {
    /// Stable tag for this finding; custom findings report their own tag.
    pub fn tag(&self) -> &str {
        match self {
            Finding::SourceMissing => "source_missing",
            Finding::AuthorMissing => "author_missing",
            Finding::SignaturePresent => "signature_present",
            Finding::AuditTrailLinked { .. } => "audit_trail_linked",
            Finding::IntentMissing => "intent_missing",
            Finding::SensitivePatternsDetected { .. } => "sensitive_patterns_detected",
            Finding::UndeclaredCapabilities { .. } => "undeclared_capabilities",
            Finding::CoherenceSummary { .. } => "coherence_summary",
            Finding::HighCurl { .. } => "high_curl",
            Finding::PositiveDivergence { .. } => "positive_divergence",
            Finding::NegativeDivergence { .. } => "negative_divergence",
            Finding::TypeMissing => "type_missing",
            Finding::TypeMismatch { .. } => "type_mismatch",
            Finding::TypeUnrecognized { .. } => "type_unrecognized",
            Finding::InterfaceContractCheck { .. } => "interface_contract_check",
            Finding::InsufficientPermissions { .. } => "insufficient_permissions",
            Finding::EnvironmentNotAllowed { .. } => "environment_not_allowed",
            Finding::GateNotFound { .. } => "gate_not_found",
            Finding::Custom { tag, .. } => tag,
        }
    }
}

/// One typed observation made by a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(flatten)]
    pub finding: Finding,
    pub severity: Severity,
    pub description: String,
}

impl Evidence {
    pub fn new(finding: Finding, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            finding,
            severity,
            description: description.into(),
        }
    }

    pub fn info(finding: Finding, description: impl Into<String>) -> Self {
        Self::new(finding, Severity::Info, description)
    }

    pub fn warning(finding: Finding, description: impl Into<String>) -> Self {
        Self::new(finding, Severity::Warning, description)
    }

    pub fn critical(finding: Finding, description: impl Into<String>) -> Self {
        Self::new(finding, Severity::Critical, description)
    }

    /// Evidence tag, e.g. `intent_missing`.
    pub fn evidence_type(&self) -> &str {
        self.finding.tag()
    }

    /// The `value` payload as JSON, if the finding carries one.
    pub fn value(&self) -> Option<Value> {
        match serde_json::to_value(&self.finding) {
            Ok(Value::Object(mut map)) => map.remove("value"),
            _ => None,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_finding_shape() {
        let evidence = Evidence::critical(Finding::IntentMissing, "No declared intent");
        let value = serde_json::to_value(&evidence).unwrap();

        assert_eq!(value["type"], "intent_missing");
        assert_eq!(value["severity"], "critical");
        assert!(value.get("value").is_none());
        assert_eq!(evidence.evidence_type(), "intent_missing");
        assert_eq!(evidence.value(), None);
    }

    #[test]
    fn test_payload_finding_shape() {
        let evidence = Evidence::critical(
            Finding::InsufficientPermissions {
                required: vec!["read".into(), "write".into()],
                granted: vec!["read".into()],
                missing: vec!["write".into()],
            },
            "Missing write",
        );
        let value = serde_json::to_value(&evidence).unwrap();

        assert_eq!(value["type"], "insufficient_permissions");
        assert_eq!(value["value"]["required"], json!(["read", "write"]));
        assert_eq!(evidence.value().unwrap()["missing"], json!(["write"]));
    }

    #[test]
    fn test_capability_serializes_snake_case() {
        let evidence = Evidence::critical(
            Finding::UndeclaredCapabilities {
                capabilities: vec![SensitiveCapability::DynamicExecution],
            },
            "eval",
        );
        assert_eq!(evidence.value().unwrap()["capabilities"], json!(["dynamic_execution"]));
    }

    #[test]
    fn test_custom_tag() {
        let evidence = Evidence::warning(
            Finding::Custom {
                tag: "license_unknown".into(),
                detail: None,
            },
            "No license header",
        );
        assert_eq!(evidence.evidence_type(), "license_unknown");
    }

    #[test]
    fn test_deserialize() {
        let evidence: Evidence = serde_json::from_value(json!({
            "type": "gate_not_found",
            "value": {"gate": "license"},
            "severity": "critical",
            "description": "Gate license is not registered"
        }))
        .unwrap();

        assert_eq!(
            evidence.finding,
            Finding::GateNotFound {
                gate: "license".into()
            }
        );
        assert!(evidence.is_critical());
    }
}
