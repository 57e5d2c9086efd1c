//! IDENTITY: content matches its declared type and interface.

use async_trait::async_trait;
use regex::Regex;

use super::{Gate, GateKind};
use crate::artifact::Artifact;
use crate::evidence::{Evidence, Finding};
use crate::types::{EvaluationContext, GateResult};

/// Declared artifact type, as understood by IDENTITY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    Json,
    Yaml,
    Toml,
    /// Any structured configuration format
    Config,
    /// Source code in the named language
    Code(String),
    /// Prose: documents, markdown, plain text
    Document,
    Unrecognized(String),
}

impl DeclaredType {
    /// Parse a declared type such as `json`, `application/yaml` or `rust`.
    pub fn parse(declared: &str) -> Self {
        let lowered = declared.trim().to_ascii_lowercase();
        let name = lowered.rsplit('/').next().unwrap_or(&lowered);
        let name = name.strip_prefix("x-").unwrap_or(name);

        match name {
            "json" => DeclaredType::Json,
            "yaml" | "yml" => DeclaredType::Yaml,
            "toml" => DeclaredType::Toml,
            "config" | "configuration" => DeclaredType::Config,
            "code" | "source" | "rust" | "rs" | "javascript" | "js" | "typescript" | "ts"
            | "python" | "py" | "go" | "java" | "c" | "cpp" | "csharp" | "kotlin" | "swift" => {
                DeclaredType::Code(name.to_string())
            }
            "document" | "doc" | "markdown" | "md" | "text" | "txt" | "plain" => {
                DeclaredType::Document
            }
            _ => DeclaredType::Unrecognized(declared.trim().to_string()),
        }
    }
}

/// Verifies content against its declared type and required interface.
#[derive(Debug, Default)]
pub struct IdentityGate;

impl IdentityGate {
    pub fn new() -> Self {
        Self
    }
}

fn check_json(content: &str) -> Result<(), String> {
    serde_json::from_str::<serde_json::Value>(content)
        .map(|_| ())
        .map_err(|e| format!("invalid JSON: {e}"))
}

fn check_yaml(content: &str) -> Result<(), String> {
    match serde_yaml::from_str::<serde_yaml::Value>(content) {
        Ok(serde_yaml::Value::Mapping(_)) | Ok(serde_yaml::Value::Sequence(_)) => Ok(()),
        Ok(_) => Err("YAML document is a bare scalar, not a mapping or sequence".to_string()),
        Err(e) => Err(format!("invalid YAML: {e}")),
    }
}

fn check_toml(content: &str) -> Result<(), String> {
    content
        .parse::<toml::Table>()
        .map(|_| ())
        .map_err(|e| format!("invalid TOML: {e}"))
}

fn check_config(content: &str) -> Result<(), String> {
    let is_structured_json = matches!(
        serde_json::from_str::<serde_json::Value>(content),
        Ok(serde_json::Value::Object(_)) | Ok(serde_json::Value::Array(_))
    );
    if is_structured_json || check_toml(content).is_ok() || check_yaml(content).is_ok() {
        Ok(())
    } else {
        Err("content is not JSON, YAML or TOML".to_string())
    }
}

/// How a language treats `'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SingleQuote {
    /// Delimits strings or char literals (`'a'`, `'...'`)
    Literal,
    /// Rust: a char literal, or a lifetime when no closing quote follows
    CharOrLifetime,
}

/// Lexical rules the delimiter scan needs for one language family.
#[derive(Debug, Clone, Copy)]
struct Syntax {
    line_comment: &'static str,
    block_comments: bool,
    single_quote: SingleQuote,
    /// `` `...` `` template literals or raw strings
    backtick_strings: bool,
    /// `"""..."""`
    triple_quotes: bool,
    /// Rust `r"..."` / `r#"..."#`
    raw_strings: bool,
}

impl Syntax {
    fn for_language(language: &str) -> Self {
        let c_family = Self {
            line_comment: "//",
            block_comments: true,
            single_quote: SingleQuote::Literal,
            backtick_strings: false,
            triple_quotes: false,
            raw_strings: false,
        };
        match language {
            "python" | "py" => Self {
                line_comment: "#",
                block_comments: false,
                triple_quotes: true,
                ..c_family
            },
            "rust" | "rs" => Self {
                single_quote: SingleQuote::CharOrLifetime,
                raw_strings: true,
                ..c_family
            },
            "javascript" | "js" | "typescript" | "ts" | "go" => Self {
                backtick_strings: true,
                ..c_family
            },
            "kotlin" | "swift" => Self {
                triple_quotes: true,
                ..c_family
            },
            _ => c_family,
        }
    }
}

fn starts_with_at(chars: &[char], at: usize, pattern: &str) -> bool {
    let mut i = at;
    for p in pattern.chars() {
        if chars.get(i) != Some(&p) {
            return false;
        }
        i += 1;
    }
    true
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Index just past the string opened at `start`.
fn skip_string(
    chars: &[char],
    start: usize,
    quote: char,
    allow_triple: bool,
    line: &mut usize,
) -> Result<usize, String> {
    let opened_at = *line;
    let triple = allow_triple
        && chars.get(start + 1) == Some(&quote)
        && chars.get(start + 2) == Some(&quote);
    let mut i = start + if triple { 3 } else { 1 };

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                if chars.get(i + 1) == Some(&'\n') {
                    *line += 1;
                }
                i += 2;
                continue;
            }
            '\n' => *line += 1,
            c if c == quote => {
                if !triple {
                    return Ok(i + 1);
                }
                if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                    return Ok(i + 3);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(format!("string opened on line {opened_at} is never closed"))
}

/// Rust raw string starting at `start` (`r"`, `r#"`, `br"`), if any.
fn raw_string_hashes(chars: &[char], start: usize) -> Option<usize> {
    if chars[start] != 'r' {
        return None;
    }
    let prefix_ok = match start.checked_sub(1).map(|p| chars[p]) {
        None => true,
        Some('b') => start < 2 || !is_ident_char(chars[start - 2]),
        Some(prev) => !is_ident_char(prev),
    };
    if !prefix_ok {
        return None;
    }
    let hashes = chars[start + 1..].iter().take_while(|c| **c == '#').count();
    (chars.get(start + 1 + hashes) == Some(&'"')).then_some(hashes)
}

fn skip_raw_string(chars: &[char], start: usize, hashes: usize, line: &mut usize) -> Result<usize, String> {
    let opened_at = *line;
    let mut i = start + hashes + 2;
    while i < chars.len() {
        if chars[i] == '\n' {
            *line += 1;
        } else if chars[i] == '"'
            && (1..=hashes).all(|h| chars.get(i + h) == Some(&'#'))
        {
            return Ok(i + 1 + hashes);
        }
        i += 1;
    }
    Err(format!("raw string opened on line {opened_at} is never closed"))
}

/// Index just past a Rust char literal at `start`, or past the `'` of a lifetime.
fn skip_char_or_lifetime(chars: &[char], start: usize) -> usize {
    match chars.get(start + 1) {
        Some('\\') => (start + 3..chars.len().min(start + 12))
            .find(|&i| chars[i] == '\'')
            .map_or(start + 1, |i| i + 1),
        Some(_) if chars.get(start + 2) == Some(&'\'') => start + 3,
        _ => start + 1,
    }
}

/// Balanced `()`, `[]`, `{}` outside the language's strings and comments.
fn check_delimiters(content: &str, language: &str) -> Result<(), String> {
    let syntax = Syntax::for_language(language);
    let chars: Vec<char> = content.chars().collect();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if starts_with_at(&chars, i, syntax.line_comment) {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if syntax.block_comments && starts_with_at(&chars, i, "/*") {
            let opened_at = line;
            i += 2;
            loop {
                match chars.get(i) {
                    None => return Err(format!("comment opened on line {opened_at} is never closed")),
                    Some('*') if chars.get(i + 1) == Some(&'/') => {
                        i += 2;
                        break;
                    }
                    Some('\n') => line += 1,
                    Some(_) => {}
                }
                i += 1;
            }
            continue;
        }
        if syntax.raw_strings {
            if let Some(hashes) = raw_string_hashes(&chars, i) {
                i = skip_raw_string(&chars, i, hashes, &mut line)?;
                continue;
            }
        }

        match c {
            '\n' => line += 1,
            '"' => {
                i = skip_string(&chars, i, '"', syntax.triple_quotes, &mut line)?;
                continue;
            }
            '\'' => {
                i = match syntax.single_quote {
                    SingleQuote::Literal => {
                        skip_string(&chars, i, '\'', syntax.triple_quotes, &mut line)?
                    }
                    SingleQuote::CharOrLifetime => skip_char_or_lifetime(&chars, i),
                };
                continue;
            }
            '`' if syntax.backtick_strings => {
                i = skip_string(&chars, i, '`', false, &mut line)?;
                continue;
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, opened_at)) => {
                        return Err(format!(
                            "'{c}' on line {line} does not close '{open}' from line {opened_at}"
                        ));
                    }
                    None => return Err(format!("unmatched '{c}' on line {line}")),
                }
            }
            _ => {}
        }
        i += 1;
    }

    match stack.pop() {
        Some((open, opened_at)) => Err(format!("'{open}' from line {opened_at} is never closed")),
        None => Ok(()),
    }
}

fn check_document(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        Err("document is empty".to_string())
    } else {
        Ok(())
    }
}

/// Whether `content` appears to expose a member called `name`.
fn exposes_member(content: &str, name: &str) -> bool {
    let name = regex::escape(name);
    let pattern = format!(
        r#"(?m)\b(?:fn|function|def|class|struct|trait|interface|enum|type|const|static|let|var|pub|async|func)\s+{name}\b|\b{name}\s*[(:=]|["']{name}["']\s*:|^\s*{name}\s*="#
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}

#[async_trait]
impl Gate for IdentityGate {
    fn name(&self) -> &str {
        GateKind::Identity.as_str()
    }

    async fn evaluate(&self, artifact: &Artifact, _context: &EvaluationContext) -> GateResult {
        let declared = artifact.artifact_type.trim();
        if declared.is_empty() {
            return GateResult::fail(
                self.name(),
                "Artifact declares no type",
                vec![Evidence::critical(Finding::TypeMissing, "Artifact declares no type")],
            );
        }

        let mut evidence = Vec::new();
        let mut failures = Vec::new();

        let declared_type = DeclaredType::parse(declared);
        let check = match &declared_type {
            DeclaredType::Json => Some(check_json(&artifact.content)),
            DeclaredType::Yaml => Some(check_yaml(&artifact.content)),
            DeclaredType::Toml => Some(check_toml(&artifact.content)),
            DeclaredType::Config => Some(check_config(&artifact.content)),
            DeclaredType::Code(language) => Some(check_delimiters(&artifact.content, language)),
            DeclaredType::Document => Some(check_document(&artifact.content)),
            DeclaredType::Unrecognized(_) => None,
        };

        match check {
            Some(Ok(())) => {}
            Some(Err(reason)) => {
                let description = format!("Content does not match declared type '{declared}': {reason}");
                failures.push(description.clone());
                evidence.push(Evidence::critical(
                    Finding::TypeMismatch {
                        declared: declared.to_string(),
                        reason,
                    },
                    description,
                ));
            }
            None => evidence.push(Evidence::info(
                Finding::TypeUnrecognized {
                    declared: declared.to_string(),
                },
                format!("No structural check for type '{declared}'"),
            )),
        }

        if let Some(required) = &artifact.metadata.required_interface {
            let required: Vec<String> = required
                .iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            let missing: Vec<String> = required
                .iter()
                .filter(|member| !exposes_member(&artifact.content, member))
                .cloned()
                .collect();

            if missing.is_empty() {
                evidence.push(Evidence::info(
                    Finding::InterfaceContractCheck {
                        required: required.clone(),
                        missing,
                    },
                    format!("All {} required members present", required.len()),
                ));
            } else {
                let description = format!("Required members missing: {}", missing.join(", "));
                failures.push(description.clone());
                evidence.push(Evidence::critical(
                    Finding::InterfaceContractCheck { required, missing },
                    description,
                ));
            }
        }

        if failures.is_empty() {
            GateResult::pass(
                self.name(),
                format!("Content is consistent with declared type '{declared}'"),
                evidence,
            )
        } else {
            GateResult::fail(self.name(), failures.join("; "), evidence)
        }
    }
}
