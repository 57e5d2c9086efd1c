//! Gateway error types.
//!
//! Artifact problems are never errors: they surface as failing gate results.
//! These cover caller mistakes only.

/// Error types for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No gate registered under this name
    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    /// A custom gate with this name already exists
    #[error("Gate already registered: {0}")]
    DuplicateGate(String),

    /// Name belongs to a built-in gate
    #[error("Gate name reserved for built-in gate: {0}")]
    ReservedGateName(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
