//! Bounded retrieval pipeline
//!
//! A [`BoundedResembla`] answers `find` in four stages:
//!
//! 1. look the query key up in the approximate index
//! 2. expand matched keys to original texts through the inverse map
//! 3. take each candidate's representation from the cache, or build it
//! 4. rerank with the configured [`Scorer`]
//!
//! Only stage 1 takes a lock. Everything else reads state that is fixed at
//! construction, so one pipeline can serve many threads.

use crate::corpus::with_attributes;
use crate::eliminator::Eliminator;
use crate::error::{ResemblaError, Result};
use crate::index::{LockedIndex, SimMeasure};
use crate::inverse::InverseMap;
use crate::measure::Scorer;
use crate::normalize::TextNormalizer;
use crate::preprocess::Preprocess;
use crate::reranker::{rerank, Candidate};
use crate::sequence::Representation;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info};

/// One retrieved text with the measure that scored it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub text: String,
    pub measure: String,
    pub score: f64,
}

/// Similar-text retrieval
///
/// `max_response = None` returns every result at or above `threshold`.
pub trait Resembla: Send + Sync {
    /// Measure name reported on results
    fn name(&self) -> &str;

    /// Retrieve corpus texts similar to `query`
    fn find(
        &self,
        query: &str,
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<ScoredResult>>;

    /// Score `query` against exactly `candidates`, bypassing the index
    fn eval(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<ScoredResult>>;
}

/// Index lookup and candidate limits for one pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub sim_measure: SimMeasure,
    pub sim_threshold: f64,
    /// Prune matched keys to this many with the eliminator
    pub max_candidate: Option<usize>,
    /// Stop expanding keys once this many candidates are collected
    pub max_reranking_num: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            sim_measure: SimMeasure::Cosine,
            sim_threshold: 0.2,
            max_candidate: None,
            max_reranking_num: None,
        }
    }
}

/// Retrieval pipeline with one preprocessor and one scorer
pub struct BoundedResembla {
    name: String,
    index: LockedIndex,
    inverse: InverseMap,
    preprocessor: Arc<dyn Preprocess>,
    scorer: Scorer,
    normalizer: Option<Arc<dyn TextNormalizer>>,
    settings: PipelineSettings,
}

impl BoundedResembla {
    /// Fails when the preprocessor builds sequences the scorer cannot compare
    pub fn new(
        name: impl Into<String>,
        index: LockedIndex,
        inverse: InverseMap,
        preprocessor: Arc<dyn Preprocess>,
        scorer: Scorer,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let name = name.into();
        if preprocessor.kind() != scorer.accepts() {
            return Err(ResemblaError::Config(format!(
                "measure '{}': preprocessor builds {} sequences but scorer '{}' compares {}",
                name,
                preprocessor.kind(),
                scorer.label(),
                scorer.accepts()
            )));
        }

        info!(
            measure = %name,
            scorer = scorer.label(),
            keys = inverse.len(),
            sim_measure = %settings.sim_measure,
            sim_threshold = settings.sim_threshold,
            "constructed retrieval pipeline"
        );
        Ok(Self {
            name,
            index,
            inverse,
            preprocessor,
            scorer,
            normalizer: None,
            settings,
        })
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn TextNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.normalizer {
            Some(n) => Cow::Owned(n.normalize(text)),
            None => Cow::Borrowed(text),
        }
    }

    fn candidate<'a>(&'a self, text: &'a str) -> Result<Candidate<'a, Representation>> {
        match self.inverse.cached(text) {
            Some(representation) => Ok(Candidate::cached(text, representation)),
            None => {
                let source = with_attributes(&self.normalize(text), self.inverse.attributes(text));
                let representation = self.preprocessor.build(&source, true)?;
                Ok(Candidate::built(text, representation))
            }
        }
    }

    /// Stages 3 and 4 over an explicit candidate list
    fn rerank_texts(
        &self,
        query: &str,
        texts: &[&str],
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<ScoredResult>> {
        let query = self.preprocessor.build(query, false)?;
        let candidates = texts
            .iter()
            .map(|text| self.candidate(text))
            .collect::<Result<Vec<_>>>()?;

        let ranked = rerank(
            &query,
            &candidates,
            |candidate, query| self.scorer.score(candidate, query),
            threshold,
            max_response,
        )?;
        debug!(
            measure = %self.name,
            candidates = candidates.len(),
            results = ranked.len(),
            "reranked"
        );

        Ok(ranked
            .into_iter()
            .map(|r| ScoredResult {
                text: r.text,
                measure: self.name.clone(),
                score: r.score,
            })
            .collect())
    }
}

impl Resembla for BoundedResembla {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(
        &self,
        query: &str,
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<ScoredResult>> {
        let query = self.normalize(query);
        let key = self.preprocessor.index(&query)?;

        let mut keys = self
            .index
            .retrieve(&key, self.settings.sim_measure, self.settings.sim_threshold)?;
        debug!(measure = %self.name, key = %key, matched = keys.len(), "index lookup");
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(k) = self.settings.max_candidate {
            if keys.len() > k {
                Eliminator::new(&key).eliminate(&mut keys, k);
                debug!(measure = %self.name, kept = keys.len(), "eliminated distant keys");
            }
        }

        let cap = self.settings.max_reranking_num;
        let mut texts: Vec<&str> = Vec::new();
        'expand: for key in &keys {
            let originals = self
                .inverse
                .originals(key)
                .ok_or_else(|| ResemblaError::MissingInverseEntry { key: key.clone() })?;
            for original in originals {
                texts.push(original);
                if cap == Some(texts.len()) {
                    break 'expand;
                }
            }
        }

        self.rerank_texts(&query, &texts, threshold, max_response)
    }

    fn eval(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f64,
        max_response: Option<usize>,
    ) -> Result<Vec<ScoredResult>> {
        let query = self.normalize(query);
        let texts: Vec<&str> = candidates.iter().map(String::as_str).collect();
        self.rerank_texts(&query, &texts, threshold, max_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ApproximateIndex, NgramIndex};
    use crate::measure::{EditDistance, KeywordMatcher, UniformCost};
    use crate::normalize::UnicodeNormalizer;
    use crate::preprocess::AsIsPreprocessor;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn inverse(rows: &str) -> InverseMap {
        InverseMap::parse(Path::new("inverse"), rows, crate::sequence::RepresentationKind::Symbols)
            .unwrap()
    }

    fn pipeline(rows: &str, settings: PipelineSettings) -> BoundedResembla {
        let inverse = inverse(rows);
        let index = NgramIndex::from_keys(2, inverse.keys().map(str::to_string).collect::<Vec<_>>());
        BoundedResembla::new(
            "edit_distance",
            LockedIndex::new(index),
            inverse,
            Arc::new(AsIsPreprocessor),
            Scorer::UniformEdit(EditDistance::new(UniformCost)),
            settings,
        )
        .unwrap()
    }

    fn texts(results: &[ScoredResult]) -> Vec<&str> {
        results.iter().map(|r| r.text.as_str()).collect()
    }

    const CORPUS: &str = "abcd\tabcd\nabce\tabce\nabce\tabce!\nwxyz\twxyz\n";

    #[test]
    fn test_find_ranks_by_score() {
        let resembla = pipeline(CORPUS, PipelineSettings::default());
        let results = resembla.find("abcd", 0.0, None).unwrap();
        assert_eq!(texts(&results), vec!["abcd", "abce", "abce!"]);
        assert_eq!(results[0].score, 1.0);
        assert!(results.iter().all(|r| r.measure == "edit_distance"));
    }

    #[test]
    fn test_find_applies_threshold_and_limit() {
        let resembla = pipeline(CORPUS, PipelineSettings::default());
        assert_eq!(texts(&resembla.find("abcd", 0.8, None).unwrap()), vec!["abcd"]);
        assert_eq!(texts(&resembla.find("abcd", 0.0, Some(2)).unwrap()), vec!["abcd", "abce"]);
    }

    #[test]
    fn test_find_without_index_hits_is_empty() {
        let resembla = pipeline(CORPUS, PipelineSettings::default());
        assert!(resembla.find("qqqq", 0.0, None).unwrap().is_empty());
    }

    #[test]
    fn test_reranking_cap_stops_expansion() {
        let settings = PipelineSettings {
            max_reranking_num: Some(2),
            ..Default::default()
        };
        let resembla = pipeline(CORPUS, settings);
        // keys come back in index order: abcd, abce; the cap cuts abce!
        assert_eq!(texts(&resembla.find("abcd", 0.0, None).unwrap()), vec!["abcd", "abce"]);
    }

    #[test]
    fn test_eliminator_prunes_keys() {
        let settings = PipelineSettings {
            sim_threshold: 0.0,
            max_candidate: Some(1),
            ..Default::default()
        };
        let resembla = pipeline(CORPUS, settings);
        assert_eq!(texts(&resembla.find("abce", 0.0, None).unwrap()), vec!["abce", "abce!"]);
    }

    #[test]
    fn test_missing_inverse_entry_is_an_error() {
        struct Stray;
        impl ApproximateIndex for Stray {
            fn retrieve(&mut self, _: &str, _: SimMeasure, _: f64) -> Result<Vec<String>> {
                Ok(vec!["ghost".into()])
            }
        }
        let resembla = BoundedResembla::new(
            "edit_distance",
            LockedIndex::new(Stray),
            inverse(CORPUS),
            Arc::new(AsIsPreprocessor),
            Scorer::UniformEdit(EditDistance::new(UniformCost)),
            PipelineSettings::default(),
        )
        .unwrap();
        assert!(matches!(
            resembla.find("abcd", 0.0, None),
            Err(ResemblaError::MissingInverseEntry { key }) if key == "ghost"
        ));
    }

    #[test]
    fn test_eval_scores_given_candidates_only() {
        let resembla = pipeline(CORPUS, PipelineSettings::default());
        let candidates = vec!["zzzz".to_string(), "abcd".to_string()];
        let results = resembla.eval("abcd", &candidates, 0.0, None).unwrap();
        assert_eq!(texts(&results), vec!["abcd", "zzzz"]);
        assert_eq!(results[1].score, 0.0);
    }

    #[test]
    fn test_query_is_normalized() {
        let resembla = pipeline(CORPUS, PipelineSettings::default())
            .with_normalizer(Arc::new(UnicodeNormalizer { lowercase: true }));
        let results = resembla.find("ＡＢＣＤ", 0.9, None).unwrap();
        assert_eq!(texts(&results), vec!["abcd"]);
    }

    #[test]
    fn test_mismatched_scorer_is_rejected() {
        let result = BoundedResembla::new(
            "keyword_match",
            LockedIndex::new(NgramIndex::new(2)),
            InverseMap::default(),
            Arc::new(AsIsPreprocessor),
            Scorer::KeywordMatch(KeywordMatcher),
            PipelineSettings::default(),
        );
        assert!(matches!(result, Err(ResemblaError::Config(_))));
    }
}
