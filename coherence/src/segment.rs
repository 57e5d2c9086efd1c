//! Sentence-like segmentation.

use serde::{Deserialize, Serialize};

/// How a segment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminator {
    /// `.`
    Statement,
    /// `?`
    Question,
    /// `!`
    Exclamation,
    /// Blank line or end of input without punctuation
    Break,
}

/// A sentence-like unit of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Trimmed text, without the terminator
    pub text: String,
    /// How the segment ended
    pub terminator: Terminator,
}

impl Segment {
    /// Lowercased words in this segment.
    pub fn words(&self) -> Vec<String> {
        words(&self.text)
    }

    /// Whether the segment ended with a question mark.
    pub fn is_question(&self) -> bool {
        self.terminator == Terminator::Question
    }
}

/// Split text into sentence-like segments.
///
/// Splits on `.`, `!`, `?` and blank lines. A period between two digits
/// (`3.14`) does not split. Runs of terminators (`?!`, `...`) close a
/// single segment; the first terminator in the run decides its kind.
pub fn segment(text: &str) -> Vec<Segment> {
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut buffer = String::new();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let terminator = match c {
            '.' => {
                let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
                let next_digit = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                if prev_digit && next_digit {
                    None
                } else {
                    Some(Terminator::Statement)
                }
            }
            '?' => Some(Terminator::Question),
            '!' => Some(Terminator::Exclamation),
            '\n' if chars.get(i + 1) == Some(&'\n') => Some(Terminator::Break),
            _ => None,
        };

        match terminator {
            Some(terminator) => {
                push_segment(&mut segments, &mut buffer, terminator);
                // Swallow the rest of a terminator run
                while i + 1 < chars.len() && matches!(chars[i + 1], '.' | '?' | '!' | '\n') {
                    i += 1;
                }
            }
            None => buffer.push(c),
        }
        i += 1;
    }
    push_segment(&mut segments, &mut buffer, Terminator::Break);

    segments
}

fn push_segment(segments: &mut Vec<Segment>, buffer: &mut String, terminator: Terminator) {
    let text = buffer.trim();
    if !text.is_empty() && text.chars().any(char::is_alphanumeric) {
        segments.push(Segment {
            text: text.to_string(),
            terminator,
        });
    }
    buffer.clear();
}

/// Lowercased alphanumeric words (apostrophes kept inside words).
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '_'))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_segmentation() {
        let segments = segment("First point. Is it true? Yes!");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "First point");
        assert_eq!(segments[0].terminator, Terminator::Statement);
        assert!(segments[1].is_question());
        assert_eq!(segments[2].terminator, Terminator::Exclamation);
    }

    #[test]
    fn test_decimal_does_not_split() {
        let segments = segment("Pi is roughly 3.14 in value.");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Pi is roughly 3.14 in value");
    }

    #[test]
    fn test_terminator_runs_collapse() {
        let segments = segment("Really?! Wait... fine");
        assert_eq!(segments.len(), 3);
        assert!(segments[0].is_question());
        assert_eq!(segments[2].terminator, Terminator::Break);
    }

    #[test]
    fn test_blank_line_splits() {
        let segments = segment("heading without stop\n\nbody text here");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].terminator, Terminator::Break);
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert!(segment("").is_empty());
        assert!(segment("  ... ?! ").is_empty());
    }

    #[test]
    fn test_words() {
        assert_eq!(
            words("Don't PANIC, it's fine_ok."),
            vec!["don't", "panic", "it's", "fine_ok"]
        );
    }
}
