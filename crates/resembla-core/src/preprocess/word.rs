use super::{original_text, TokenSource};
use crate::error::Result;
use crate::sequence::Word;
use crate::tokenizer::SharedTokenizer;

/// Minimum number of feature fields every word carries (IPADIC layout)
const MIN_FEATURES: usize = 9;

/// Morphemes from the shared tokenizer, indexed by the raw text
#[derive(Debug, Clone)]
pub struct WordPreprocessor {
    tokenizer: SharedTokenizer,
}

impl WordPreprocessor {
    pub fn new(tokenizer: SharedTokenizer) -> Self {
        Self { tokenizer }
    }
}

impl TokenSource for WordPreprocessor {
    type Token = Word;

    fn tokens(&self, text: &str, is_original: bool) -> Result<Vec<Word>> {
        let mut words = self.tokenizer.tokenize(original_text(text, is_original))?;
        for word in &mut words {
            if word.features.len() < MIN_FEATURES {
                word.features.resize(MIN_FEATURES, String::new());
            }
        }
        Ok(words)
    }

    fn index(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}
