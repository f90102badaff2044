//! Input text normalization

use unicode_normalization::UnicodeNormalization;

/// Rewrites raw text into a canonical form; must be idempotent
pub trait TextNormalizer: Send + Sync {
    fn normalize(&self, text: &str) -> String;
}

/// NFKC normalization with optional lower-casing
///
/// Folds full-width ASCII and half-width katakana into their standard forms
/// so queries and corpus texts index under the same keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeNormalizer {
    pub lowercase: bool,
}

impl TextNormalizer for UnicodeNormalizer {
    fn normalize(&self, text: &str) -> String {
        let normalized: String = text.nfkc().collect();
        if self.lowercase {
            normalized.to_lowercase()
        } else {
            normalized
        }
    }
}
