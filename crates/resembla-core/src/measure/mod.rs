//! Similarity measures
//!
//! Each measure pairs a preprocessor with a [`Scorer`]. Measures are named
//! the way index and inverse-map files are suffixed on disk.

pub mod cost;
pub mod edit_distance;
pub mod keyword;
pub mod scorer;

use crate::error::{ResemblaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use cost::{
    KanaMismatchCost, LetterCost, MismatchCost, RomajiMismatchCost, UniformCost,
    WordMismatchCost,
};
pub use edit_distance::{EditDistance, WeightedEditDistance};
pub use keyword::KeywordMatcher;
pub use scorer::{Scorer, WeightedEdit};

/// Retrieval measures that can be configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureKind {
    EditDistance,
    WeightedWordEditDistance,
    WeightedPronunciationEditDistance,
    WeightedRomajiEditDistance,
    KeywordMatch,
}

impl MeasureKind {
    pub const ALL: [MeasureKind; 5] = [
        Self::EditDistance,
        Self::WeightedWordEditDistance,
        Self::WeightedPronunciationEditDistance,
        Self::WeightedRomajiEditDistance,
        Self::KeywordMatch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::EditDistance => "edit_distance",
            Self::WeightedWordEditDistance => "weighted_word_edit_distance",
            Self::WeightedPronunciationEditDistance => "weighted_pronunciation_edit_distance",
            Self::WeightedRomajiEditDistance => "weighted_romaji_edit_distance",
            Self::KeywordMatch => "keyword_match",
        }
    }
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MeasureKind {
    type Err = ResemblaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| ResemblaError::Config(format!("unknown measure: '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for measure in MeasureKind::ALL {
            assert_eq!(measure.name().parse::<MeasureKind>().unwrap(), measure);
        }
    }

    #[test]
    fn test_unknown_name_is_config_error() {
        let err = "svm".parse::<MeasureKind>().unwrap_err();
        assert!(matches!(err, ResemblaError::Config(_)));
    }
}
