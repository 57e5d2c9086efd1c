//! Validation inputs and outputs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;

/// Caller-supplied authorization context, consulted by PASSAGE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationContext {
    /// Permissions the artifact needs
    pub required_permissions: BTreeSet<String>,
    /// Permissions the caller holds
    pub granted_permissions: BTreeSet<String>,
    /// Environments the artifact may run in; empty means unrestricted
    pub allowed_environments: BTreeSet<String>,
    /// Target environment; falls back to the gateway's configured one
    pub environment: Option<String>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, permission: impl Into<String>) -> Self {
        self.required_permissions.insert(permission.into());
        self
    }

    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.granted_permissions.insert(permission.into());
        self
    }

    pub fn allow_environment(mut self, environment: impl Into<String>) -> Self {
        self.allowed_environments.insert(environment.into());
        self
    }

    pub fn in_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}

/// Per-run options for [`crate::Gateway::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Minimum coherence score; the gateway default applies when unset
    pub coherence_threshold: Option<f64>,
    /// Gate names recorded as skipped instead of evaluated
    pub skip_gates: BTreeSet<String>,
    /// Authorization context
    pub context: ValidationContext,
    /// Custom gates to run after IDENTITY, in order
    pub plan: Vec<String>,
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coherence_threshold(mut self, threshold: f64) -> Self {
        self.coherence_threshold = Some(threshold);
        self
    }

    pub fn skip(mut self, gate: impl Into<String>) -> Self {
        self.skip_gates.insert(gate.into().trim().to_lowercase());
        self
    }

    pub fn with_context(mut self, context: ValidationContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_custom_gate(mut self, gate: impl Into<String>) -> Self {
        self.plan.push(gate.into());
        self
    }
}

/// Resolved context handed to every gate.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    /// Authorization context from the caller
    pub validation: ValidationContext,
    /// Effective coherence threshold
    pub coherence_threshold: f64,
    /// Effective target environment
    pub environment: String,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self {
            validation: ValidationContext::default(),
            coherence_threshold: 0.5,
            environment: "development".to_string(),
        }
    }
}

/// Verdict of a single gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate name
    pub gate: String,
    pub passed: bool,
    /// Observations, in the order they were made
    pub evidence: Vec<Evidence>,
    /// Human-readable summary of the verdict
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
    /// Coherence score, for gates that compute one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coherence_score: Option<f64>,
}

impl GateResult {
    pub fn pass(gate: impl Into<String>, reasoning: impl Into<String>, evidence: Vec<Evidence>) -> Self {
        Self::new(gate, true, reasoning, evidence)
    }

    pub fn fail(gate: impl Into<String>, reasoning: impl Into<String>, evidence: Vec<Evidence>) -> Self {
        Self::new(gate, false, reasoning, evidence)
    }

    pub fn new(
        gate: impl Into<String>,
        passed: bool,
        reasoning: impl Into<String>,
        evidence: Vec<Evidence>,
    ) -> Self {
        Self {
            gate: gate.into(),
            passed,
            evidence,
            reasoning: reasoning.into(),
            timestamp: Utc::now(),
            coherence_score: None,
        }
    }

    pub fn with_coherence_score(mut self, score: f64) -> Self {
        self.coherence_score = Some(score);
        self
    }

    /// First evidence item with the given tag.
    pub fn evidence_of(&self, evidence_type: &str) -> Option<&Evidence> {
        self.evidence.iter().find(|e| e.evidence_type() == evidence_type)
    }

    pub fn has_evidence(&self, evidence_type: &str) -> bool {
        self.evidence_of(evidence_type).is_some()
    }
}

/// Why a gate did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotExecutedReason {
    /// Listed in `skip_gates`
    Skipped,
    /// An earlier gate failed
    ShortCircuited,
}

/// What happened to one gate in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateOutcome {
    Executed { result: GateResult },
    NotExecuted { reason: NotExecutedReason },
}

impl GateOutcome {
    pub fn result(&self) -> Option<&GateResult> {
        match self {
            GateOutcome::Executed { result } => Some(result),
            GateOutcome::NotExecuted { .. } => None,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, GateOutcome::Executed { .. })
    }

    /// `Some(passed)` if the gate ran.
    pub fn passed(&self) -> Option<bool> {
        self.result().map(|r| r.passed)
    }

    pub fn not_executed_reason(&self) -> Option<NotExecutedReason> {
        match self {
            GateOutcome::NotExecuted { reason } => Some(*reason),
            GateOutcome::Executed { .. } => None,
        }
    }
}

/// A gate's slot in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateRecord {
    pub gate: String,
    #[serde(flatten)]
    pub outcome: GateOutcome,
}

/// Aggregate outcome of [`crate::Gateway::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Unique id of this run, recorded in every ledger entry it produced
    pub run_id: String,
    pub artifact_id: String,
    /// Every planned gate, in execution order
    pub gates: Vec<GateRecord>,
    /// No executed gate failed
    pub passed: bool,
    /// First failing gate
    pub failed_at: Option<String>,
    /// Ledger entry ids, one per executed gate that was logged
    pub ledger_entries: Vec<String>,
    /// At least one ledger write failed
    pub logging_degraded: bool,
    /// Ledger failures, `gate: error`
    pub logging_errors: Vec<String>,
}

impl ValidationResult {
    /// Outcome of the named gate.
    pub fn gate(&self, name: &str) -> Option<&GateOutcome> {
        self.gates.iter().find(|g| g.gate == name).map(|g| &g.outcome)
    }

    /// Result of the named gate, if it ran.
    pub fn gate_result(&self, name: &str) -> Option<&GateResult> {
        self.gate(name).and_then(GateOutcome::result)
    }

    /// Names of gates that ran, in order.
    pub fn executed_gates(&self) -> Vec<&str> {
        self.gates
            .iter()
            .filter(|g| g.outcome.is_executed())
            .map(|g| g.gate.as_str())
            .collect()
    }
}
