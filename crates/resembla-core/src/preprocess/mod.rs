//! Preprocessors: raw text to sequence representation
//!
//! A preprocessor builds the representation a scorer compares and the key
//! the approximate index is searched with. Corpus texts are built with
//! `is_original = true`: they may carry tab-separated attributes after the
//! text, and weights may treat them differently from queries (for example a
//! deletion/insertion cost ratio).
//!
//! Weighted measures are assembled from two independent halves: a
//! [`TokenSource`] that splits text into tokens and a
//! [`WeightFunction`](crate::sequence::WeightFunction) that weights them.

mod asis;
mod keyword;
mod pronunciation;
mod word;

use crate::error::Result;
use crate::sequence::{Representation, RepresentationKind, SequenceToken, WeightFunction, Weighted};

pub use asis::AsIsPreprocessor;
pub use keyword::KeywordMatchPreprocessor;
pub use pronunciation::{PronunciationPreprocessor, RomajiPreprocessor};
pub use word::WordPreprocessor;

const COLUMN_DELIMITER: char = '\t';

/// The text part of a corpus entry, without trailing attribute columns
pub fn original_text(text: &str, is_original: bool) -> &str {
    if is_original {
        text.split(COLUMN_DELIMITER).next().unwrap_or_default()
    } else {
        text
    }
}

/// Builds representations and index keys for one measure
pub trait Preprocess: Send + Sync {
    /// Kind of representation `build` produces
    fn kind(&self) -> RepresentationKind;

    fn build(&self, text: &str, is_original: bool) -> Result<Representation>;

    /// Canonical key stored in the approximate index
    fn index(&self, text: &str) -> Result<String>;
}

/// Splits text into tokens for a weighted sequence
pub trait TokenSource: Send + Sync {
    type Token: SequenceToken;

    fn tokens(&self, text: &str, is_original: bool) -> Result<Vec<Self::Token>>;

    fn index(&self, text: &str) -> Result<String>;
}

/// Combines a token source with a weight function
#[derive(Debug, Clone)]
pub struct WeightedSequenceBuilder<S, W> {
    source: S,
    weight: W,
}

impl<S, W> WeightedSequenceBuilder<S, W> {
    pub fn new(source: S, weight: W) -> Self {
        Self { source, weight }
    }
}

impl<S, W> Preprocess for WeightedSequenceBuilder<S, W>
where
    S: TokenSource,
    W: WeightFunction<S::Token>,
{
    fn kind(&self) -> RepresentationKind {
        S::Token::KIND
    }

    fn build(&self, text: &str, is_original: bool) -> Result<Representation> {
        let tokens = self.source.tokens(text, is_original)?;
        let total = tokens.len();
        let sequence = tokens
            .into_iter()
            .enumerate()
            .map(|(position, token)| {
                let weight = self.weight.weight(&token, is_original, total, position);
                Weighted::new(token, weight)
            })
            .collect();
        Ok(S::Token::into_representation(sequence))
    }

    fn index(&self, text: &str) -> Result<String> {
        self.source.index(text)
    }
}
