//! The closed set of scoring functions a pipeline can rerank with

use super::cost::{LetterCost, UniformCost, WordMismatchCost};
use super::edit_distance::{EditDistance, WeightedEditDistance};
use super::keyword::KeywordMatcher;
use crate::error::{ResemblaError, Result};
use crate::regression::RegressionScorer;
use crate::sequence::{Representation, RepresentationKind};

/// Weighted edit distance over letters or words
#[derive(Debug, Clone)]
pub enum WeightedEdit {
    Letters(WeightedEditDistance<LetterCost>),
    Words(WeightedEditDistance<WordMismatchCost>),
}

/// Scoring function selected at configuration time
///
/// Every variant maps a `(candidate, query)` pair to a similarity in
/// `[0, 1]` where 1.0 means identical. Weighted edit distances are inverted
/// here (`1 - d`); the raw distance stays available on
/// [`WeightedEditDistance::distance`].
#[derive(Debug, Clone)]
pub enum Scorer {
    UniformEdit(EditDistance<UniformCost>),
    WeightedEdit(WeightedEdit),
    KeywordMatch(KeywordMatcher),
    Regression(RegressionScorer),
}

impl Scorer {
    pub fn label(&self) -> &'static str {
        match self {
            Self::UniformEdit(_) => "uniform-edit",
            Self::WeightedEdit(_) => "weighted-edit",
            Self::KeywordMatch(_) => "keyword-match",
            Self::Regression(_) => "regression",
        }
    }

    /// Representation kind this scorer compares
    pub fn accepts(&self) -> RepresentationKind {
        match self {
            Self::UniformEdit(_) => RepresentationKind::Symbols,
            Self::WeightedEdit(WeightedEdit::Letters(_)) => RepresentationKind::Letters,
            Self::WeightedEdit(WeightedEdit::Words(_)) => RepresentationKind::Words,
            Self::KeywordMatch(_) => RepresentationKind::Keywords,
            Self::Regression(_) => RepresentationKind::Features,
        }
    }

    pub fn score(&self, candidate: &Representation, query: &Representation) -> Result<f64> {
        use Representation as R;

        match (self, candidate, query) {
            (Self::UniformEdit(d), R::Symbols(c), R::Symbols(q)) => Ok(d.similarity(c, q)),
            (Self::WeightedEdit(WeightedEdit::Letters(d)), R::Letters(c), R::Letters(q)) => {
                Ok(1.0 - d.distance(c, q))
            }
            (Self::WeightedEdit(WeightedEdit::Words(d)), R::Words(c), R::Words(q)) => {
                Ok(1.0 - d.distance(c, q))
            }
            // negative keyword balance means no evidence of similarity
            (Self::KeywordMatch(m), R::Keywords(c), R::Keywords(q)) => {
                Ok(m.score(q, c).clamp(0.0, 1.0))
            }
            (Self::Regression(r), R::Features(c), R::Features(q)) => r.score(q, c),
            _ => {
                let offending = if candidate.kind() == self.accepts() {
                    query.kind()
                } else {
                    candidate.kind()
                };
                Err(ResemblaError::RepresentationMismatch {
                    scorer: self.label(),
                    representation: offending.as_str(),
                })
            }
        }
    }
}
