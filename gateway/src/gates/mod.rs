//! Gate trait and the built-in gates.

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::types::{EvaluationContext, GateResult};

mod coherence;
mod identity;
mod intent;
mod origin;
mod passage;

pub use coherence::CoherenceGate;
pub use identity::{DeclaredType, IdentityGate};
pub use intent::{IntentGate, SensitiveCapability};
pub use origin::OriginGate;
pub use passage::PassageGate;

/// A validation gate.
///
/// Gates report artifact problems as failing results, never as errors.
#[async_trait]
pub trait Gate: Send + Sync {
    /// Gate name, lowercase.
    fn name(&self) -> &str;

    /// Evaluate an artifact.
    async fn evaluate(&self, artifact: &Artifact, context: &EvaluationContext) -> GateResult;
}

/// The built-in gates, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    Origin,
    Intent,
    Coherence,
    Identity,
    Passage,
}

impl GateKind {
    /// Built-in execution order. Planned custom gates run between IDENTITY and PASSAGE.
    pub const SEQUENCE: [GateKind; 5] = [
        GateKind::Origin,
        GateKind::Intent,
        GateKind::Coherence,
        GateKind::Identity,
        GateKind::Passage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateKind::Origin => "origin",
            GateKind::Intent => "intent",
            GateKind::Coherence => "coherence",
            GateKind::Identity => "identity",
            GateKind::Passage => "passage",
        }
    }

    /// Parse a gate name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::SEQUENCE
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_kind_names() {
        assert_eq!(GateKind::from_name("ORIGIN"), Some(GateKind::Origin));
        assert_eq!(GateKind::from_name(" passage "), Some(GateKind::Passage));
        assert_eq!(GateKind::from_name("license"), None);
        assert_eq!(GateKind::SEQUENCE[2].to_string(), "coherence");
    }
}
