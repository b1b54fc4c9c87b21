//! Best-effort inspection of `[i]` citation markers in generated answers.
//!
//! Nothing here rejects an answer. The report exists so callers can surface
//! markers that point past the retrieved list and sentences with no marker.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::synthesizer::REFUSAL;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationReport {
    /// Valid source indices referenced by the answer.
    pub cited: BTreeSet<usize>,
    /// Markers that do not correspond to any retrieved passage.
    pub out_of_range: Vec<usize>,
    /// Sentences carrying no marker at all.
    pub uncited_sentences: Vec<String>,
    pub refusal: bool,
}

impl CitationReport {
    #[must_use]
    pub fn analyze(answer: &str, n_sources: usize) -> Self {
        let trimmed = answer.trim();
        if is_refusal(trimmed) {
            return Self {
                refusal: true,
                ..Self::default()
            };
        }

        let mut report = Self::default();
        for cap in MARKER_RE.captures_iter(trimmed) {
            // Digits that overflow usize are as out of range as any other.
            let idx = cap[1].parse::<usize>().unwrap_or(usize::MAX);
            if idx < n_sources {
                report.cited.insert(idx);
            } else if !report.out_of_range.contains(&idx) {
                report.out_of_range.push(idx);
            }
        }

        report.uncited_sentences = split_sentences(trimmed)
            .into_iter()
            .filter(|s| !MARKER_RE.is_match(s))
            .map(|s| s.trim().to_owned())
            .collect();
        report
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.out_of_range.is_empty() && self.uncited_sentences.is_empty()
    }

    /// Emit warnings for every problem found.
    pub fn log(&self) {
        if !self.out_of_range.is_empty() {
            tracing::warn!(markers = ?self.out_of_range, "answer cites passages that were not retrieved");
        }
        if !self.uncited_sentences.is_empty() {
            tracing::warn!(
                count = self.uncited_sentences.len(),
                "answer contains sentences without citations"
            );
        }
    }
}

fn is_refusal(answer: &str) -> bool {
    answer
        .trim_end_matches(['.', '!'])
        .eq_ignore_ascii_case(REFUSAL)
}

// A sentence ends at `.`, `?` or `!` followed by whitespace, or at a blank line.
// Markers trailing the terminator (`Paris. [0]`) stay with the preceding sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        current.push(chars[i]);

        let ends_sentence = matches!(chars[i], '.' | '?' | '!')
            && chars.get(i + 1).is_some_and(|c| c.is_whitespace());
        let paragraph_break = chars[i] == '\n' && chars.get(i + 1) == Some(&'\n');

        if ends_sentence || paragraph_break {
            // Pull a following marker group into this sentence.
            let mut j = i + 1;
            while j < chars.len() && chars[j] == ' ' {
                j += 1;
            }
            if chars.get(j) == Some(&'[') {
                while j < chars.len() && chars[j - 1] != ']' {
                    j += 1;
                }
                current.extend(&chars[i + 1..j]);
                i = j - 1;
            }
            if !current.trim().is_empty() {
                sentences.push(std::mem::take(&mut current));
            }
        }
        i += 1;
    }

    if !current.trim().is_empty() {
        sentences.push(current);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_valid_markers() {
        let report = CitationReport::analyze("Paris is the capital [0]. It is large [1][0].", 2);
        assert_eq!(report.cited, BTreeSet::from([0, 1]));
        assert!(report.out_of_range.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn flags_out_of_range_markers() {
        let report = CitationReport::analyze("Paris [0]. Lyon [5]. Nice [5].", 2);
        assert_eq!(report.out_of_range, [5]);
        assert!(!report.is_clean());
    }

    #[test]
    fn flags_uncited_sentences() {
        let report = CitationReport::analyze("Paris is the capital [0]. It has a river.", 1);
        assert_eq!(report.uncited_sentences, ["It has a river."]);
    }

    #[test]
    fn marker_after_terminator_counts() {
        let report = CitationReport::analyze("Paris is the capital. [0] Lyon is a city. [1]", 2);
        assert!(report.uncited_sentences.is_empty());
        assert_eq!(report.cited, BTreeSet::from([0, 1]));
    }

    #[test]
    fn refusal_is_exempt() {
        for answer in ["I don't know", "I don't know.", "  i don't know  "] {
            let report = CitationReport::analyze(answer, 0);
            assert!(report.refusal);
            assert!(report.is_clean());
        }
    }

    #[test]
    fn huge_marker_is_out_of_range() {
        let report = CitationReport::analyze("Claim [99999999999999999999999].", 3);
        assert_eq!(report.out_of_range, [usize::MAX]);
    }
}
