//! Sequence representations
//!
//! Every measure compares texts through a [`Representation`]: the ordered
//! token sequence a preprocessor builds from raw text. Token order is
//! significant. Weighted tokens default to a weight of 1.0.
//!
//! Representations can be persisted as the third column of an inverse-map
//! file so corpus texts don't need re-tokenizing at query time:
//!
//! | kind | JSON shape |
//! |------|------------|
//! | symbols | `"text"` |
//! | letters | `[{"t":"ア","w":1.0}, ...]` |
//! | words | `[{"t":{"s":"surface","f":["名詞", ...]},"w":2.0}, ...]` |
//! | keywords | `{"t":"text","k":["kw", ...]}` |
//! | features | `{"name": 0.5, ...}` |

pub mod kana;
pub mod weight;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use weight::{LetterWeight, RomajiWeight, UniformWeight, WeightFunction, WordWeight};

/// Named numeric features used by regression reranking
pub type FeatureMap = BTreeMap<String, f64>;

/// A morpheme produced by a tokenizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    #[serde(rename = "s")]
    pub surface: String,
    /// Feature tags; positions follow the analyzer's dictionary convention
    #[serde(rename = "f")]
    pub features: Vec<String>,
}

impl Word {
    pub fn new(surface: impl Into<String>, features: Vec<String>) -> Self {
        Self {
            surface: surface.into(),
            features,
        }
    }

    /// Feature at `pos`, or `""` when the analyzer produced fewer fields
    pub fn feature(&self, pos: usize) -> &str {
        self.features.get(pos).map(String::as_str).unwrap_or_default()
    }
}

/// A token carrying its insertion/deletion weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    #[serde(rename = "t")]
    pub token: T,
    #[serde(rename = "w")]
    pub weight: f64,
}

impl<T> Weighted<T> {
    pub fn new(token: T, weight: f64) -> Self {
        Self { token, weight }
    }

    pub fn unit(token: T) -> Self {
        Self::new(token, 1.0)
    }
}

/// Text split from its attached keywords
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordText {
    #[serde(rename = "t")]
    pub text: String,
    #[serde(rename = "k")]
    pub keywords: Vec<String>,
}

/// The sequence form of a text used for exact scoring
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    /// Raw characters, unweighted
    Symbols(Vec<char>),
    /// Phonetic or romaji letters
    Letters(Vec<Weighted<char>>),
    /// Morphemes with grammatical features
    Words(Vec<Weighted<Word>>),
    Keywords(KeywordText),
    Features(FeatureMap),
}

/// Discriminant of [`Representation`], needed to parse cached JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    Symbols,
    Letters,
    Words,
    Keywords,
    Features,
}

impl RepresentationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symbols => "symbols",
            Self::Letters => "letters",
            Self::Words => "words",
            Self::Keywords => "keywords",
            Self::Features => "features",
        }
    }
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Representation {
    pub fn kind(&self) -> RepresentationKind {
        match self {
            Self::Symbols(_) => RepresentationKind::Symbols,
            Self::Letters(_) => RepresentationKind::Letters,
            Self::Words(_) => RepresentationKind::Words,
            Self::Keywords(_) => RepresentationKind::Keywords,
            Self::Features(_) => RepresentationKind::Features,
        }
    }

    /// Serialize to the inverse-map cache column
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::Symbols(s) => serde_json::to_string(&s.iter().collect::<String>())?,
            Self::Letters(s) => serde_json::to_string(s)?,
            Self::Words(s) => serde_json::to_string(s)?,
            Self::Keywords(k) => serde_json::to_string(k)?,
            Self::Features(f) => serde_json::to_string(f)?,
        };
        Ok(json)
    }

    /// Parse a cache column written by [`Representation::to_json`]
    pub fn from_json(kind: RepresentationKind, json: &str) -> Result<Self> {
        let repr = match kind {
            RepresentationKind::Symbols => {
                Self::Symbols(serde_json::from_str::<String>(json)?.chars().collect())
            }
            RepresentationKind::Letters => Self::Letters(serde_json::from_str(json)?),
            RepresentationKind::Words => Self::Words(serde_json::from_str(json)?),
            RepresentationKind::Keywords => Self::Keywords(serde_json::from_str(json)?),
            RepresentationKind::Features => Self::Features(serde_json::from_str(json)?),
        };
        Ok(repr)
    }
}

/// Token types that weighted sequence builders can emit
pub trait SequenceToken: Clone + Send + Sync + 'static {
    const KIND: RepresentationKind;

    fn into_representation(sequence: Vec<Weighted<Self>>) -> Representation;
}

impl SequenceToken for char {
    const KIND: RepresentationKind = RepresentationKind::Letters;

    fn into_representation(sequence: Vec<Weighted<Self>>) -> Representation {
        Representation::Letters(sequence)
    }
}

impl SequenceToken for Word {
    const KIND: RepresentationKind = RepresentationKind::Words;

    fn into_representation(sequence: Vec<Weighted<Self>>) -> Representation {
        Representation::Words(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_word_json_shape() {
        let words = Representation::Words(vec![Weighted::new(
            Word::new("猫", vec!["名詞".into(), "一般".into()]),
            2.0,
        )]);
        assert_eq!(
            words.to_json().unwrap(),
            r#"[{"t":{"s":"猫","f":["名詞","一般"]},"w":2.0}]"#
        );
    }

    #[test]
    fn test_letter_and_keyword_json_shape() {
        let letters = Representation::Letters(vec![Weighted::unit('ア')]);
        assert_eq!(letters.to_json().unwrap(), r#"[{"t":"ア","w":1.0}]"#);

        let keywords = Representation::Keywords(KeywordText {
            text: "hello".into(),
            keywords: vec!["he".into()],
        });
        assert_eq!(keywords.to_json().unwrap(), r#"{"t":"hello","k":["he"]}"#);
    }

    #[test]
    fn test_parse_requires_matching_kind() {
        let json = Representation::Symbols("abc".chars().collect())
            .to_json()
            .unwrap();
        assert!(Representation::from_json(RepresentationKind::Words, &json).is_err());
        assert_eq!(
            Representation::from_json(RepresentationKind::Symbols, &json).unwrap(),
            Representation::Symbols(vec!['a', 'b', 'c'])
        );
    }

    #[test]
    fn test_missing_feature_reads_empty() {
        let word = Word::new("x", vec!["名詞".into()]);
        assert_eq!(word.feature(0), "名詞");
        assert_eq!(word.feature(7), "");
    }
}
