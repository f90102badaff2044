use super::{original_text, TokenSource};
use crate::error::Result;
use crate::sequence::kana;
use crate::tokenizer::SharedTokenizer;

/// Katakana reading of a text, letter by letter
///
/// The reading of each morpheme is taken from the feature at
/// `feature_pos`. Kana-only surfaces and morphemes without a reading are
/// read from their surface. Morphemes whose reading equals
/// `pronunciation_of_marks` (the analyzer's reading for symbols) keep
/// their surface.
#[derive(Debug, Clone)]
pub struct PronunciationPreprocessor {
    tokenizer: SharedTokenizer,
    feature_pos: usize,
    pronunciation_of_marks: String,
}

impl PronunciationPreprocessor {
    pub fn new(
        tokenizer: SharedTokenizer,
        feature_pos: usize,
        pronunciation_of_marks: impl Into<String>,
    ) -> Self {
        Self {
            tokenizer,
            feature_pos,
            pronunciation_of_marks: pronunciation_of_marks.into(),
        }
    }

    pub fn pronounce(&self, text: &str) -> Result<String> {
        let mut reading = String::new();
        for word in self.tokenizer.tokenize(text)? {
            let feature = word.feature(self.feature_pos);
            if feature.is_empty() || feature == "*" || kana::is_kana_word(&word.surface) {
                reading.push_str(&kana::to_katakana(&word.surface));
            } else if feature == self.pronunciation_of_marks {
                reading.push_str(&word.surface);
            } else {
                reading.push_str(&kana::to_katakana(feature));
            }
        }
        Ok(reading)
    }
}

impl TokenSource for PronunciationPreprocessor {
    type Token = char;

    fn tokens(&self, text: &str, is_original: bool) -> Result<Vec<char>> {
        Ok(self
            .pronounce(original_text(text, is_original))?
            .chars()
            .collect())
    }

    fn index(&self, text: &str) -> Result<String> {
        self.pronounce(text)
    }
}

/// Romaji transliteration of the katakana reading
#[derive(Debug, Clone)]
pub struct RomajiPreprocessor {
    pronunciation: PronunciationPreprocessor,
    keep_case: bool,
}

impl RomajiPreprocessor {
    pub fn new(pronunciation: PronunciationPreprocessor, keep_case: bool) -> Self {
        Self {
            pronunciation,
            keep_case,
        }
    }
}

impl TokenSource for RomajiPreprocessor {
    type Token = char;

    fn tokens(&self, text: &str, is_original: bool) -> Result<Vec<char>> {
        let reading = self.pronunciation.pronounce(original_text(text, is_original))?;
        Ok(kana::to_romaji(&reading, self.keep_case))
    }

    fn index(&self, text: &str) -> Result<String> {
        let reading = self.pronunciation.pronounce(text)?;
        Ok(kana::to_romaji(&reading, self.keep_case).into_iter().collect())
    }
}
