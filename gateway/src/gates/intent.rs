//! INTENT: declared purpose versus what the content does.

use std::collections::BTreeMap;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Gate, GateKind};
use crate::artifact::Artifact;
use crate::evidence::{Evidence, Finding};
use crate::types::{EvaluationContext, GateResult};

/// Capabilities that must be acknowledged in the declared intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveCapability {
    DynamicExecution,
    ProcessInvocation,
    CredentialHandling,
    NetworkExfiltration,
}

impl SensitiveCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitiveCapability::DynamicExecution => "dynamic_execution",
            SensitiveCapability::ProcessInvocation => "process_invocation",
            SensitiveCapability::CredentialHandling => "credential_handling",
            SensitiveCapability::NetworkExfiltration => "network_exfiltration",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SensitiveCapability::DynamicExecution => "dynamic code execution",
            SensitiveCapability::ProcessInvocation => "process invocation",
            SensitiveCapability::CredentialHandling => "credential handling",
            SensitiveCapability::NetworkExfiltration => "outbound network access",
        }
    }

    /// Phrases in an intent that acknowledge this capability.
    fn acknowledgements(&self) -> &'static [&'static str] {
        match self {
            SensitiveCapability::DynamicExecution => &[
                "eval",
                "exec",
                "dynamic code",
                "dynamic execution",
                "code execution",
                "evaluates code",
                "evaluate code",
                "executes code",
            ],
            SensitiveCapability::ProcessInvocation => &[
                "subprocess",
                "subprocesses",
                "shell command",
                "shell commands",
                "system command",
                "system commands",
                "runs commands",
                "run commands",
                "executes commands",
                "child process",
                "child processes",
                "spawns processes",
                "process invocation",
            ],
            SensitiveCapability::CredentialHandling => &[
                "credential",
                "credentials",
                "secret",
                "secrets",
                "password",
                "passwords",
                "api key",
                "api keys",
                "access token",
                "access tokens",
                "api token",
                "auth token",
                "authentication token",
                "private key",
            ],
            SensitiveCapability::NetworkExfiltration => &[
                "http request",
                "http requests",
                "https request",
                "network request",
                "network requests",
                "network access",
                "network call",
                "network calls",
                "over the network",
                "sends data",
                "send data",
                "upload",
                "uploads",
                "uploading",
                "outbound",
                "api call",
                "api calls",
                "http client",
                "remote server",
                "remote endpoint",
            ],
        }
    }
}

/// (capability, pattern, keyword that also acknowledges it)
const PATTERNS: &[(SensitiveCapability, &str, &str)] = &[
    (SensitiveCapability::DynamicExecution, r"(?i)\beval\s*\(", "eval"),
    (SensitiveCapability::DynamicExecution, r"(?i)\bexec\s*\(", "exec"),
    (SensitiveCapability::DynamicExecution, r"\bnew\s+Function\s*\(", "eval"),
    (SensitiveCapability::DynamicExecution, r"\b__import__\s*\(", "dynamic import"),
    (SensitiveCapability::ProcessInvocation, r"\bsubprocess\.\w+", "subprocess"),
    (SensitiveCapability::ProcessInvocation, r"\bos\.system\s*\(", "os.system"),
    (SensitiveCapability::ProcessInvocation, r"\bchild_process\b", "child_process"),
    (SensitiveCapability::ProcessInvocation, r"\bCommand::new\s*\(", "process::command"),
    (SensitiveCapability::ProcessInvocation, r"\bpopen\s*\(", "popen"),
    (
        SensitiveCapability::CredentialHandling,
        r"(?i)(?:\b|_)(?:password|passwd|secret|credentials?|private[_-]?key|api[_-]?key)(?:\b|_)",
        "credential",
    ),
    (SensitiveCapability::CredentialHandling, r"\b[A-Z0-9_]*_TOKEN\b", "credential"),
    (
        SensitiveCapability::CredentialHandling,
        r"(?i)(?:\b|_)(?:access|auth|bearer|refresh|api|session)[_-]?token(?:\b|_)",
        "credential",
    ),
    (SensitiveCapability::NetworkExfiltration, r"\bfetch\s*\(", "fetch api"),
    (
        SensitiveCapability::NetworkExfiltration,
        r"\brequests\.(get|post|put|patch)\s*\(",
        "requests library",
    ),
    (SensitiveCapability::NetworkExfiltration, r"\bXMLHttpRequest\b", "xmlhttprequest"),
    (SensitiveCapability::NetworkExfiltration, r"\burllib\.request\b", "urllib"),
    (SensitiveCapability::NetworkExfiltration, r"\breqwest::", "reqwest"),
    (SensitiveCapability::NetworkExfiltration, r"\bsocket\.(connect|send)\w*\s*\(", "socket"),
];

/// Matched snippets kept per capability.
const MAX_MATCHES: usize = 5;

struct CapabilityPattern {
    capability: SensitiveCapability,
    regex: Regex,
    keyword: &'static str,
}

/// Compares the declared intent against sensitive patterns in the content.
///
/// Fails when the intent is empty, or when the content uses a sensitive
/// capability the intent does not mention.
pub struct IntentGate {
    patterns: Vec<CapabilityPattern>,
}

impl IntentGate {
    pub fn new() -> Self {
        let patterns = PATTERNS
            .iter()
            .filter_map(|(capability, pattern, keyword)| match Regex::new(pattern) {
                Ok(regex) => Some(CapabilityPattern {
                    capability: *capability,
                    regex,
                    keyword: *keyword,
                }),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Skipping invalid intent pattern");
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// Sensitive capabilities used by `content`, with matched snippets and keywords.
    fn detect(&self, content: &str) -> BTreeMap<SensitiveCapability, Detection> {
        let mut detections: BTreeMap<SensitiveCapability, Detection> = BTreeMap::new();

        for pattern in &self.patterns {
            let mut found = pattern.regex.find_iter(content).peekable();
            if found.peek().is_none() {
                continue;
            }
            let detection = detections.entry(pattern.capability).or_default();
            if !detection.keywords.contains(&pattern.keyword) {
                detection.keywords.push(pattern.keyword);
            }
            for m in found {
                let snippet = m.as_str().trim().trim_matches('_').to_string();
                if detection.matches.len() < MAX_MATCHES && !detection.matches.contains(&snippet) {
                    detection.matches.push(snippet);
                }
            }
        }

        detections
    }
}

impl Default for IntentGate {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct Detection {
    matches: Vec<String>,
    keywords: Vec<&'static str>,
}

/// Whether `phrase` occurs in `words` on word boundaries.
fn mentions(words: &[String], phrase: &str) -> bool {
    let target = coherence::words(phrase);
    if target.is_empty() || target.len() > words.len() {
        return false;
    }
    words.windows(target.len()).any(|window| window == target.as_slice())
}

fn acknowledged(words: &[String], capability: SensitiveCapability, detection: &Detection) -> bool {
    capability
        .acknowledgements()
        .iter()
        .chain(detection.keywords.iter())
        .any(|phrase| mentions(words, phrase))
}

#[async_trait]
impl Gate for IntentGate {
    fn name(&self) -> &str {
        GateKind::Intent.as_str()
    }

    async fn evaluate(&self, artifact: &Artifact, _context: &EvaluationContext) -> GateResult {
        let intent = artifact.metadata.intent.trim();
        let detections = self.detect(&artifact.content);
        let mut evidence = Vec::new();

        if intent.is_empty() {
            evidence.push(Evidence::critical(
                Finding::IntentMissing,
                "Artifact declares no intent",
            ));
        }

        for (capability, detection) in &detections {
            evidence.push(Evidence::info(
                Finding::SensitivePatternsDetected {
                    capability: *capability,
                    matches: detection.matches.clone(),
                },
                format!(
                    "Content uses {}: {}",
                    capability.description(),
                    detection.matches.join(", ")
                ),
            ));
        }

        if intent.is_empty() {
            return GateResult::fail(
                self.name(),
                "Declared intent is required to judge what the artifact does",
                evidence,
            );
        }

        let intent_words = coherence::words(intent);
        let undeclared: Vec<SensitiveCapability> = detections
            .iter()
            .filter(|(capability, detection)| !acknowledged(&intent_words, **capability, detection))
            .map(|(capability, _)| *capability)
            .collect();

        if undeclared.is_empty() {
            let reasoning = if detections.is_empty() {
                "Declared intent present; no sensitive capabilities detected".to_string()
            } else {
                "Declared intent acknowledges every sensitive capability detected".to_string()
            };
            return GateResult::pass(self.name(), reasoning, evidence);
        }

        let names: Vec<&str> = undeclared.iter().map(|c| c.description()).collect();
        let description = format!("Intent does not mention {}", names.join(", "));
        evidence.push(Evidence::critical(
            Finding::UndeclaredCapabilities {
                capabilities: undeclared,
            },
            description.clone(),
        ));
        GateResult::fail(self.name(), description, evidence)
    }
}
