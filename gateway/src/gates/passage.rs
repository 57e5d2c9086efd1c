//! PASSAGE: authorization for the target environment.

use async_trait::async_trait;

use super::{Gate, GateKind};
use crate::artifact::Artifact;
use crate::evidence::{Evidence, Finding};
use crate::types::{EvaluationContext, GateResult};

/// Checks required permissions against granted ones, and the target
/// environment against the allowed set.
#[derive(Debug, Default)]
pub struct PassageGate;

impl PassageGate {
    pub fn new() -> Self {
        Self
    }
}

fn braced(items: &[String]) -> String {
    format!("{{{}}}", items.join(", "))
}

#[async_trait]
impl Gate for PassageGate {
    fn name(&self) -> &str {
        GateKind::Passage.as_str()
    }

    async fn evaluate(&self, _artifact: &Artifact, context: &EvaluationContext) -> GateResult {
        let ctx = &context.validation;
        let mut evidence = Vec::new();
        let mut failures = Vec::new();

        let missing: Vec<String> = ctx
            .required_permissions
            .difference(&ctx.granted_permissions)
            .cloned()
            .collect();
        if !missing.is_empty() {
            let required: Vec<String> = ctx.required_permissions.iter().cloned().collect();
            let granted: Vec<String> = ctx.granted_permissions.iter().cloned().collect();
            let description = format!(
                "Requires {} but only {} granted; missing {}",
                braced(&required),
                braced(&granted),
                braced(&missing)
            );
            failures.push(description.clone());
            evidence.push(Evidence::critical(
                Finding::InsufficientPermissions {
                    required,
                    granted,
                    missing,
                },
                description,
            ));
        }

        let environment = &context.environment;
        if !ctx.allowed_environments.is_empty() && !ctx.allowed_environments.contains(environment) {
            let allowed: Vec<String> = ctx.allowed_environments.iter().cloned().collect();
            let description = format!(
                "Environment '{environment}' is not in allowed set {}",
                braced(&allowed)
            );
            failures.push(description.clone());
            evidence.push(Evidence::critical(
                Finding::EnvironmentNotAllowed {
                    environment: environment.clone(),
                    allowed,
                },
                description,
            ));
        }

        if failures.is_empty() {
            GateResult::pass(
                self.name(),
                format!("Authorized for passage into '{environment}'"),
                evidence,
            )
        } else {
            GateResult::fail(self.name(), failures.join("; "), evidence)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationContext;

    fn evaluate(validation: ValidationContext, environment: &str) -> GateResult {
        let context = EvaluationContext {
            validation,
            environment: environment.to_string(),
            ..Default::default()
        };
        let artifact = Artifact::new("a-1", "text", "notes");
        tokio_test::block_on(PassageGate::new().evaluate(&artifact, &context))
    }

    #[test]
    fn test_no_requirements_passes() {
        let result = evaluate(ValidationContext::new(), "development");
        assert!(result.passed);
        assert!(result.evidence.is_empty());
    }

    #[test]
    fn test_insufficient_permissions() {
        let context = ValidationContext::new()
            .require("read")
            .require("write")
            .grant("read");

        let result = evaluate(context, "development");
        assert!(!result.passed);

        let value = result.evidence_of("insufficient_permissions").unwrap().value().unwrap();
        assert_eq!(value["required"], serde_json::json!(["read", "write"]));
        assert_eq!(value["missing"], serde_json::json!(["write"]));
        assert!(result.reasoning.contains("{read, write}"));
    }

    #[test]
    fn test_superset_grant_passes() {
        let context = ValidationContext::new().require("read").grant("read").grant("admin");
        assert!(evaluate(context, "development").passed);
    }

    #[test]
    fn test_environment_restriction() {
        let context = ValidationContext::new()
            .allow_environment("staging")
            .allow_environment("production");

        assert!(evaluate(context.clone(), "staging").passed);

        let result = evaluate(context, "development");
        assert!(!result.passed);
        assert_eq!(
            result.evidence_of("environment_not_allowed").unwrap().value().unwrap()["environment"],
            "development"
        );
    }
}
