//! Registry of built-in and custom gates.

use std::sync::Arc;

use coherence::CoherenceConfig;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::GatewayError;
use crate::gates::{
    CoherenceGate, Gate, GateKind, IdentityGate, IntentGate, OriginGate, PassageGate,
};

/// Normalized gate name: trimmed, lowercase.
pub fn normalize_gate_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Built-in gates plus custom gates registered at runtime.
///
/// Built-in names are reserved. Custom gates keep registration order.
pub struct GateRegistry {
    builtins: Vec<(GateKind, Arc<dyn Gate>)>,
    custom: Arc<RwLock<Vec<(String, Arc<dyn Gate>)>>>,
}

impl GateRegistry {
    /// Create a registry holding the five built-in gates.
    pub fn new(coherence: CoherenceConfig) -> Self {
        let builtins: Vec<(GateKind, Arc<dyn Gate>)> = vec![
            (GateKind::Origin, Arc::new(OriginGate::new()) as Arc<dyn Gate>),
            (GateKind::Intent, Arc::new(IntentGate::new()) as Arc<dyn Gate>),
            (GateKind::Coherence, Arc::new(CoherenceGate::new(coherence)) as Arc<dyn Gate>),
            (GateKind::Identity, Arc::new(IdentityGate::new()) as Arc<dyn Gate>),
            (GateKind::Passage, Arc::new(PassageGate::new()) as Arc<dyn Gate>),
        ];

        Self {
            builtins,
            custom: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// The built-in gate of the given kind.
    pub fn builtin(&self, kind: GateKind) -> Option<Arc<dyn Gate>> {
        self.builtins
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, gate)| gate.clone())
    }

    /// Register a custom gate under `name`.
    pub async fn register(&self, name: &str, gate: Arc<dyn Gate>) -> Result<(), GatewayError> {
        let name = normalize_gate_name(name);
        if name.is_empty() {
            return Err(GatewayError::Config("gate name must not be empty".to_string()));
        }
        if GateKind::from_name(&name).is_some() {
            return Err(GatewayError::ReservedGateName(name));
        }

        let mut custom = self.custom.write().await;
        if custom.iter().any(|(existing, _)| *existing == name) {
            return Err(GatewayError::DuplicateGate(name));
        }
        info!(gate = %name, "Registered custom gate");
        custom.push((name, gate));
        Ok(())
    }

    /// Remove a custom gate. Returns whether it was registered.
    pub async fn unregister(&self, name: &str) -> bool {
        let name = normalize_gate_name(name);
        let mut custom = self.custom.write().await;
        let before = custom.len();
        custom.retain(|(existing, _)| *existing != name);
        custom.len() != before
    }

    /// Look up any gate, built-in or custom.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Gate>> {
        if let Some(kind) = GateKind::from_name(name) {
            return self.builtin(kind);
        }
        let name = normalize_gate_name(name);
        let custom = self.custom.read().await;
        custom
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, gate)| gate.clone())
    }

    /// Whether a gate is registered under `name`.
    pub async fn has(&self, name: &str) -> bool {
        self.get(name).await.is_some()
    }

    /// Custom gate names, in registration order.
    pub async fn custom_names(&self) -> Vec<String> {
        let custom = self.custom.read().await;
        custom.iter().map(|(name, _)| name.clone()).collect()
    }

    /// All gate names: built-ins in execution order, then custom gates.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = GateKind::SEQUENCE
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect();
        names.extend(self.custom_names().await);
        names
    }
}

impl Default for GateRegistry {
    fn default() -> Self {
        Self::new(CoherenceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::types::{EvaluationContext, GateResult};
    use async_trait::async_trait;

    struct AlwaysPass;

    #[async_trait]
    impl Gate for AlwaysPass {
        fn name(&self) -> &str {
            "always"
        }

        async fn evaluate(&self, _artifact: &Artifact, _context: &EvaluationContext) -> GateResult {
            GateResult::pass("always", "ok", vec![])
        }
    }

    #[tokio::test]
    async fn test_builtins_present() {
        let registry = GateRegistry::default();
        assert_eq!(
            registry.names().await,
            vec!["origin", "intent", "coherence", "identity", "passage"]
        );
        assert!(registry.has("COHERENCE").await);
        assert_eq!(registry.get("passage").await.unwrap().name(), "passage");
    }

    #[tokio::test]
    async fn test_register_custom() {
        let registry = GateRegistry::default();
        registry.register("License", Arc::new(AlwaysPass)).await.unwrap();
        registry.register("lint", Arc::new(AlwaysPass)).await.unwrap();

        assert!(registry.has("license").await);
        assert_eq!(registry.custom_names().await, vec!["license", "lint"]);
        assert_eq!(registry.names().await.len(), 7);
    }

    #[tokio::test]
    async fn test_register_rejects_conflicts() {
        let registry = GateRegistry::default();

        let reserved = registry.register("Origin", Arc::new(AlwaysPass)).await;
        assert!(matches!(reserved, Err(GatewayError::ReservedGateName(name)) if name == "origin"));

        registry.register("license", Arc::new(AlwaysPass)).await.unwrap();
        let duplicate = registry.register(" license ", Arc::new(AlwaysPass)).await;
        assert!(matches!(duplicate, Err(GatewayError::DuplicateGate(_))));

        let empty = registry.register("  ", Arc::new(AlwaysPass)).await;
        assert!(matches!(empty, Err(GatewayError::Config(_))));
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = GateRegistry::default();
        registry.register("license", Arc::new(AlwaysPass)).await.unwrap();

        assert!(registry.unregister("license").await);
        assert!(!registry.unregister("license").await);
        assert!(!registry.has("license").await);
    }
}
