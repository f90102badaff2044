//! Keyword presence scoring

use crate::sequence::KeywordText;
use memchr::memmem;

/// Scores how many of a reference's keywords occur in a target text
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMatcher;

impl KeywordMatcher {
    /// `(found - missing) / keywords` over `reference.keywords`, in `[-1, 1]`
    ///
    /// A reference without keywords scores 0.
    pub fn score(&self, target: &KeywordText, reference: &KeywordText) -> f64 {
        if reference.keywords.is_empty() {
            return 0.0;
        }
        let haystack = target.text.as_bytes();
        let score: f64 = reference
            .keywords
            .iter()
            .map(|keyword| {
                if memmem::find(haystack, keyword.as_bytes()).is_some() {
                    1.0
                } else {
                    -1.0
                }
            })
            .sum();
        score / reference.keywords.len() as f64
    }
}
