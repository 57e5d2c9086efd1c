//! Artifacts submitted for validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An artifact submitted to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Caller-assigned identifier
    pub id: String,
    /// Declared type (`json`, `yaml`, `rust`, `markdown`, ...)
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// Raw content
    pub content: String,
    /// Declared intent and contract
    #[serde(default)]
    pub metadata: ArtifactMetadata,
    /// Where the artifact came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Who produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Opaque signature, recorded but not verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Artifact metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// What the artifact claims to do
    #[serde(default)]
    pub intent: String,
    /// Member names the artifact must expose
    #[serde(
        default,
        alias = "requiredInterface",
        skip_serializing_if = "Option::is_none"
    )]
    pub required_interface: Option<Vec<String>>,
    /// Ledger entry id of a prior decision about this artifact
    #[serde(
        default,
        alias = "auditTrailRef",
        skip_serializing_if = "Option::is_none"
    )]
    pub audit_trail_ref: Option<String>,
    /// Anything else the caller attached
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Artifact {
    /// Create an artifact with empty metadata and no provenance.
    pub fn new(
        id: impl Into<String>,
        artifact_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            artifact_type: artifact_type.into(),
            content: content.into(),
            metadata: ArtifactMetadata::default(),
            source: None,
            author: None,
            signature: None,
        }
    }

    /// Parse an artifact from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.metadata.intent = intent.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_required_interface<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.required_interface = Some(members.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_audit_trail_ref(mut self, entry_id: impl Into<String>) -> Self {
        self.metadata.audit_trail_ref = Some(entry_id.into());
        self
    }

    /// Declared source, if present and not blank.
    pub fn declared_source(&self) -> Option<&str> {
        non_blank(self.source.as_deref())
    }

    /// Declared author, if present and not blank.
    pub fn declared_author(&self) -> Option<&str> {
        non_blank(self.author.as_deref())
    }

    /// Signature, if present and not blank.
    pub fn declared_signature(&self) -> Option<&str> {
        non_blank(self.signature.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
