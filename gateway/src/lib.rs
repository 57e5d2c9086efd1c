//! Multi-gate artifact validation.
//!
//! An [`Artifact`] (code, document, configuration) passes through a fixed
//! sequence of gates, each producing a verdict plus typed [`Evidence`]:
//!
//! ```text
//! ORIGIN -> INTENT -> COHERENCE -> IDENTITY -> [planned custom gates] -> PASSAGE
//! ```
//!
//! The first failing gate halts the run; every later gate is recorded as
//! not executed. Every executed gate's verdict is appended to the decision
//! ledger through a [`ledger::DecisionLogger`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gateway::{Artifact, Gateway, ValidationOptions};
//! use ledger::Ledger;
//!
//! let ledger = Arc::new(Ledger::in_memory().await?);
//! let gateway = Gateway::with_defaults(ledger.clone());
//!
//! let artifact = Artifact::new("a-1", "json", r#"{"name": "demo"}"#)
//!     .with_intent("Adds demo settings")
//!     .with_source("git://config-repo")
//!     .with_author("alice");
//!
//! let result = gateway.validate(&artifact, &ValidationOptions::default()).await;
//! assert!(result.passed);
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod evidence;
pub mod gates;
pub mod gateway;
pub mod registry;
pub mod types;

pub use artifact::{Artifact, ArtifactMetadata};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use evidence::{Evidence, Finding, Severity};
pub use gates::{Gate, GateKind, SensitiveCapability};
pub use gateway::Gateway;
pub use registry::GateRegistry;
pub use types::*;
