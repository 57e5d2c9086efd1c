//! The validation pipeline.

use std::sync::Arc;

use ledger::{DecisionLogger, NewEntry, Outcome};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifact::Artifact;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::evidence::{Evidence, Finding};
use crate::gates::{Gate, GateKind};
use crate::registry::{normalize_gate_name, GateRegistry};
use crate::types::{
    EvaluationContext, GateOutcome, GateRecord, GateResult, NotExecutedReason, ValidationOptions,
    ValidationResult,
};

/// Pipeline state. A run starts evaluating and halts at the first failure.
#[derive(Debug, Clone, PartialEq)]
enum RunState {
    Evaluating,
    Halted { failed_at: String },
}

/// Bookkeeping for one `validate` call.
struct Run {
    run_id: String,
    state: RunState,
    gates: Vec<GateRecord>,
    ledger_entries: Vec<String>,
    logging_errors: Vec<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            state: RunState::Evaluating,
            gates: Vec::new(),
            ledger_entries: Vec::new(),
            logging_errors: Vec::new(),
        }
    }

    fn not_executed(&mut self, gate: &str, reason: NotExecutedReason) {
        self.gates.push(GateRecord {
            gate: gate.to_string(),
            outcome: GateOutcome::NotExecuted { reason },
        });
    }

    fn executed(&mut self, result: GateResult) {
        if !result.passed && self.state == RunState::Evaluating {
            self.state = RunState::Halted {
                failed_at: result.gate.clone(),
            };
        }
        self.gates.push(GateRecord {
            gate: result.gate.clone(),
            outcome: GateOutcome::Executed { result },
        });
    }

    fn finish(self, artifact_id: &str) -> ValidationResult {
        let failed_at = match self.state {
            RunState::Evaluating => None,
            RunState::Halted { failed_at } => Some(failed_at),
        };
        ValidationResult {
            run_id: self.run_id,
            artifact_id: artifact_id.to_string(),
            gates: self.gates,
            passed: failed_at.is_none(),
            failed_at,
            ledger_entries: self.ledger_entries,
            logging_degraded: !self.logging_errors.is_empty(),
            logging_errors: self.logging_errors,
        }
    }
}

/// Runs artifacts through the gate sequence and logs every verdict.
pub struct Gateway {
    config: GatewayConfig,
    registry: GateRegistry,
    logger: Arc<dyn DecisionLogger>,
}

impl Gateway {
    /// Create a gateway with a validated config.
    pub fn new(logger: Arc<dyn DecisionLogger>, config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self {
            registry: GateRegistry::new(config.coherence.clone()),
            config,
            logger,
        })
    }

    /// Create a gateway with the default config.
    pub fn with_defaults(logger: Arc<dyn DecisionLogger>) -> Self {
        let config = GatewayConfig::default();
        Self {
            registry: GateRegistry::new(config.coherence.clone()),
            config,
            logger,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &GateRegistry {
        &self.registry
    }

    /// Register a custom gate. It runs only when a run's plan names it.
    pub async fn register_custom_gate(
        &self,
        name: &str,
        gate: Arc<dyn Gate>,
    ) -> Result<(), GatewayError> {
        self.registry.register(name, gate).await
    }

    /// Names of every registered gate: built-ins in order, then custom gates.
    pub async fn get_available_gates(&self) -> Vec<String> {
        self.registry.names().await
    }

    /// Evaluate a single gate in isolation. Nothing is written to the ledger.
    pub async fn validate_gate(
        &self,
        name: &str,
        artifact: &Artifact,
        options: &ValidationOptions,
    ) -> Result<GateResult, GatewayError> {
        let gate_name = normalize_gate_name(name);
        let gate = self
            .registry
            .get(&gate_name)
            .await
            .ok_or_else(|| GatewayError::UnknownGate(name.to_string()))?;

        let context = self.evaluation_context(options);
        let mut result = gate.evaluate(artifact, &context).await;
        result.gate = gate_name;
        Ok(result)
    }

    /// Run the full gate sequence.
    ///
    /// Never fails: artifact problems are failing gates, and ledger write
    /// failures are reported through `logging_degraded`.
    pub async fn validate(&self, artifact: &Artifact, options: &ValidationOptions) -> ValidationResult {
        let context = self.evaluation_context(options);
        let plan = self.plan(options);
        let mut run = Run::new();

        info!(
            run_id = %run.run_id,
            artifact_id = %artifact.id,
            gates = plan.len(),
            "Validation started"
        );

        for gate_name in &plan {
            if matches!(run.state, RunState::Halted { .. }) {
                run.not_executed(gate_name, NotExecutedReason::ShortCircuited);
                continue;
            }
            if options
                .skip_gates
                .iter()
                .any(|skipped| normalize_gate_name(skipped) == *gate_name)
            {
                debug!(run_id = %run.run_id, gate = %gate_name, "Gate skipped");
                run.not_executed(gate_name, NotExecutedReason::Skipped);
                continue;
            }

            let result = self.evaluate_gate(gate_name, artifact, &context).await;
            debug!(
                run_id = %run.run_id,
                gate = %gate_name,
                passed = result.passed,
                "Gate evaluated"
            );
            self.record(&mut run, artifact, &result).await;
            run.executed(result);
        }

        let result = run.finish(&artifact.id);
        if result.passed {
            info!(run_id = %result.run_id, artifact_id = %result.artifact_id, "Validation passed");
        } else {
            warn!(
                run_id = %result.run_id,
                artifact_id = %result.artifact_id,
                failed_at = ?result.failed_at,
                "Validation failed"
            );
        }
        result
    }

    fn evaluation_context(&self, options: &ValidationOptions) -> EvaluationContext {
        EvaluationContext {
            validation: options.context.clone(),
            coherence_threshold: options
                .coherence_threshold
                .unwrap_or(self.config.default_coherence_threshold),
            environment: options
                .context
                .environment
                .clone()
                .unwrap_or_else(|| self.config.environment.clone()),
        }
    }

    /// ORIGIN, INTENT, COHERENCE, IDENTITY, planned custom gates, PASSAGE.
    fn plan(&self, options: &ValidationOptions) -> Vec<String> {
        let mut plan: Vec<String> = GateKind::SEQUENCE[..4]
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect();

        for name in &options.plan {
            let name = normalize_gate_name(name);
            if GateKind::from_name(&name).is_some() {
                warn!(gate = %name, "Built-in gate named in plan; it already runs in sequence");
                continue;
            }
            if !name.is_empty() && !plan.contains(&name) {
                plan.push(name);
            }
        }

        plan.push(GateKind::Passage.as_str().to_string());
        plan
    }

    async fn evaluate_gate(
        &self,
        gate_name: &str,
        artifact: &Artifact,
        context: &EvaluationContext,
    ) -> GateResult {
        match self.registry.get(gate_name).await {
            Some(gate) => {
                let mut result = gate.evaluate(artifact, context).await;
                result.gate = gate_name.to_string();
                result
            }
            None => {
                let description = format!("Gate '{gate_name}' is not registered");
                GateResult::fail(
                    gate_name,
                    description.clone(),
                    vec![Evidence::critical(
                        Finding::GateNotFound {
                            gate: gate_name.to_string(),
                        },
                        description,
                    )],
                )
            }
        }
    }

    /// Append the gate's verdict to the ledger, chained to the run's previous entry.
    async fn record(&self, run: &mut Run, artifact: &Artifact, result: &GateResult) {
        let (verdict, outcome) = if result.passed {
            ("PASS", Outcome::Pass)
        } else {
            ("FAIL", Outcome::Fail)
        };

        let mut entry = NewEntry::new(
            format!("{}:{}", self.config.actor_prefix, result.gate),
            format!("Gate {} {}", result.gate.to_uppercase(), verdict),
            result.reasoning.clone(),
            outcome,
        )
        .with_context(json!({
            "run_id": run.run_id,
            "artifact_id": artifact.id,
            "artifact_type": artifact.artifact_type,
            "gate": result.gate,
            "evidence": result.evidence,
        }));
        if let Some(score) = result.coherence_score {
            entry = entry.with_coherence_score(score);
        }
        if let Some(parent) = run.ledger_entries.last() {
            entry = entry.with_parent(parent.clone());
        }

        match self.logger.log(entry).await {
            Ok(entry_id) => run.ledger_entries.push(entry_id),
            Err(e) => {
                error!(
                    run_id = %run.run_id,
                    gate = %result.gate,
                    error = %e,
                    "Failed to log gate decision"
                );
                run.logging_errors.push(format!("{}: {}", result.gate, e));
            }
        }
    }
}
